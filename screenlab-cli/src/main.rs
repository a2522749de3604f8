//! ScreenLab CLI: screen a CSV universe, analyze one symbol, manage the cache.
//!
//! Commands:
//! - `screen`: evaluate criteria (JSON) against every symbol in a data directory
//! - `analyze`: indicator detail record for one symbol
//! - `symbols`: list the symbols a data directory provides
//! - `cache status`: number of entries in the disk cache
//! - `cache clear`: remove every disk cache entry

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use screenlab_core::{Criteria, IndicatorFamily};
use screenlab_runner::{
    cache_from_config, init_logging, load_universe, DetailRecord, DiskCache, LoadedUniverse,
    Screener, ScreenerConfig, Verbosity,
};

#[derive(Parser)]
#[command(name = "screenlab", about = "ScreenLab technical-indicator equity screener")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen every symbol in a data directory against criteria.
    Screen {
        /// Directory of <SYMBOL>.csv files.
        #[arg(long, default_value = "data")]
        data: PathBuf,

        /// Criteria as inline JSON, e.g. '{"indicators":{"rsi":{"below":30}}}'.
        #[arg(long, conflicts_with = "criteria_file")]
        criteria: Option<String>,

        /// Criteria JSON file.
        #[arg(long)]
        criteria_file: Option<PathBuf>,

        /// Restrict the universe to these symbols (in this order).
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        /// Print detail records instead of a symbol list.
        #[arg(long, default_value_t = false)]
        detailed: bool,
    },
    /// Print the indicator detail record for one symbol.
    Analyze {
        symbol: String,

        /// Directory of <SYMBOL>.csv files.
        #[arg(long, default_value = "data")]
        data: PathBuf,

        /// Indicator families to include (rsi, macd, ma). All when omitted.
        #[arg(long, value_delimiter = ',')]
        indicators: Vec<String>,
    },
    /// List the symbols available in a data directory.
    Symbols {
        /// Directory of <SYMBOL>.csv files.
        #[arg(long, default_value = "data")]
        data: PathBuf,
    },
    /// Disk cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report the number of cached indicator entries.
    Status {
        /// Cache directory. Defaults to `cache.dir` from the config.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Remove every cached indicator entry.
    Clear {
        /// Cache directory. Defaults to `cache.dir` from the config.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ScreenerConfig::from_file(path)?,
        None => ScreenerConfig::default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Screen {
            data,
            criteria,
            criteria_file,
            symbols,
            detailed,
        } => run_screen(&config, &data, criteria, criteria_file, &symbols, detailed),
        Commands::Analyze {
            symbol,
            data,
            indicators,
        } => run_analyze(&config, &data, &symbol, &indicators),
        Commands::Symbols { data } => run_symbols(&data),
        Commands::Cache { action } => match action {
            CacheAction::Status { dir } => run_cache_status(&config, dir),
            CacheAction::Clear { dir } => run_cache_clear(&config, dir),
        },
    }
}

fn load(data: &Path, symbols: Option<&[String]>) -> Result<LoadedUniverse> {
    let loaded = load_universe(data, symbols)
        .with_context(|| format!("failed to load universe from {}", data.display()))?;
    for (symbol, reason) in &loaded.rejected {
        warn!(symbol = %symbol, reason = %reason, "data file skipped");
    }
    Ok(loaded)
}

fn screener(config: &ScreenerConfig) -> Result<Screener> {
    let cache = cache_from_config(&config.cache)?;
    let screener = Screener::new(config, cache)?;
    debug!(
        workers = screener.worker_count(),
        settings = ?screener.settings(),
        "screener ready"
    );
    Ok(screener)
}

fn run_screen(
    config: &ScreenerConfig,
    data: &Path,
    criteria: Option<String>,
    criteria_file: Option<PathBuf>,
    symbols: &[String],
    detailed: bool,
) -> Result<()> {
    let text = match (criteria, criteria_file) {
        (Some(inline), None) => inline,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read criteria file {}", path.display()))?,
        (None, None) => bail!("one of --criteria or --criteria-file is required"),
        (Some(_), Some(_)) => bail!("--criteria and --criteria-file are mutually exclusive"),
    };
    let criteria = Criteria::from_json(&text)?;

    let symbols = (!symbols.is_empty()).then_some(symbols);
    let loaded = load(data, symbols)?;
    let screener = screener(config)?;

    let verbosity = if detailed {
        Verbosity::Detailed
    } else {
        Verbosity::Symbols
    };
    let result = screener.screen_with(&criteria, &loaded.universe, verbosity, None)?;

    for skipped in result.faults() {
        warn!(symbol = %skipped.symbol, reason = ?skipped.reason, "symbol faulted");
    }
    info!(
        request_id = %result.request_id,
        matches = result.matches.len(),
        evaluated = result.evaluated,
        skipped = result.skipped.len(),
        "done"
    );

    println!("{}", serde_json::to_string_pretty(&result.output(verbosity))?);
    Ok(())
}

fn run_analyze(
    config: &ScreenerConfig,
    data: &Path,
    symbol: &str,
    indicators: &[String],
) -> Result<()> {
    let families = indicators
        .iter()
        .map(|name| name.parse::<IndicatorFamily>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(anyhow::Error::msg)?;

    let loaded = load(data, None)?;
    let screener = screener(config)?;

    let snapshot = screener.analyze(&symbol.to_ascii_uppercase(), &families, &loaded.universe)?;
    println!("{}", serde_json::to_string_pretty(&DetailRecord::from(&snapshot))?);
    Ok(())
}

fn run_symbols(data: &Path) -> Result<()> {
    let loaded = load(data, None)?;
    for symbol in loaded.universe.symbols() {
        println!("{symbol}");
    }
    Ok(())
}

fn cache_dir(config: &ScreenerConfig, dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| config.cache.dir.clone())
}

fn run_cache_status(config: &ScreenerConfig, dir: Option<PathBuf>) -> Result<()> {
    let dir = cache_dir(config, dir);
    if !dir.exists() {
        println!("Cache directory {} does not exist (0 entries)", dir.display());
        return Ok(());
    }
    let cache = DiskCache::new(&dir)?;
    println!("Cache directory: {}", cache.dir().display());
    println!("Entries:         {}", cache.len()?);
    Ok(())
}

fn run_cache_clear(config: &ScreenerConfig, dir: Option<PathBuf>) -> Result<()> {
    let dir = cache_dir(config, dir);
    if !dir.exists() {
        println!("Nothing to clear: {} does not exist", dir.display());
        return Ok(());
    }
    let removed = DiskCache::new(&dir)?.clear()?;
    println!("Removed {removed} cache entries from {}", dir.display());
    Ok(())
}
