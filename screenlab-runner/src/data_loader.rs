//! Universe loading from a directory of per-symbol CSV files.
//!
//! Each file is `<SYMBOL>.csv` with a header row:
//!
//! ```text
//! date,open,high,low,close,adj_close,volume
//! 2024-01-02,187.15,188.44,183.89,185.64,185.10,82488700
//! ```
//!
//! `adj_close` may be absent or empty, in which case it defaults to `close`.
//! A file that fails to parse or whose dates are not strictly increasing is
//! reported in [`LoadedUniverse::rejected`] and left out; it never aborts
//! the load.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use screenlab_core::{PriceBar, PriceSeries, SeriesError, Universe};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data directory '{0}' does not exist or is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid series in '{path}': {source}")]
    Series {
        path: PathBuf,
        #[source]
        source: SeriesError,
    },

    #[error("no data file for '{symbol}' in '{dir}'")]
    MissingSymbol { symbol: String, dir: PathBuf },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    adj_close: Option<f64>,
    volume: u64,
}

impl From<CsvRow> for PriceBar {
    fn from(row: CsvRow) -> Self {
        PriceBar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            adj_close: row.adj_close.unwrap_or(row.close),
            volume: row.volume,
        }
    }
}

/// A loaded universe plus the files that were left out.
#[derive(Debug)]
pub struct LoadedUniverse {
    pub universe: Universe,
    /// (symbol, reason) for each file that could not be used.
    pub rejected: Vec<(String, String)>,
}

/// Symbol for a data file: the upper-cased file stem.
pub fn symbol_for(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    (!stem.is_empty()).then(|| stem.to_ascii_uppercase())
}

/// Load one symbol's series from a CSV file.
pub fn load_series(path: &Path) -> Result<PriceSeries, LoadError> {
    let symbol = symbol_for(path).unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut bars = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        bars.push(PriceBar::from(row));
    }

    let inconsistent = bars.iter().filter(|b| !b.ohlc_consistent()).count();
    if inconsistent > 0 {
        debug!(symbol = %symbol, bars = inconsistent, "inconsistent OHLC rows kept");
    }

    PriceSeries::new(symbol, bars).map_err(|source| LoadError::Series {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every `*.csv` in `dir` (sorted by symbol), or only `symbols` in the
/// given order when provided. A requested symbol without a file is an error;
/// a file that exists but cannot be used is rejected.
pub fn load_universe(dir: &Path, symbols: Option<&[String]>) -> Result<LoadedUniverse, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_path_buf()));
    }

    let paths = match symbols {
        Some(wanted) => wanted
            .iter()
            .map(|symbol| find_file(dir, symbol))
            .collect::<Result<Vec<_>, _>>()?,
        None => list_csv_files(dir)?,
    };

    let mut universe = Universe::default();
    let mut rejected = Vec::new();
    for path in paths {
        match load_series(&path) {
            Ok(series) => {
                debug!(symbol = series.symbol(), bars = series.len(), "loaded series");
                universe.push(series);
            }
            Err(e) => {
                let symbol = symbol_for(&path).unwrap_or_else(|| path.display().to_string());
                warn!(symbol = %symbol, error = %e, "rejected data file");
                rejected.push((symbol, e.to_string()));
            }
        }
    }

    Ok(LoadedUniverse { universe, rejected })
}

fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source: std::io::Error| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv") {
            paths.push(path);
        }
    }
    paths.sort_by_key(|p| symbol_for(p));
    Ok(paths)
}

/// Case-insensitive match of `<symbol>.csv`.
fn find_file(dir: &Path, symbol: &str) -> Result<PathBuf, LoadError> {
    let exact = dir.join(format!("{symbol}.csv"));
    if exact.is_file() {
        return Ok(exact);
    }
    let wanted = symbol.to_ascii_uppercase();
    list_csv_files(dir)?
        .into_iter()
        .find(|p| symbol_for(p).as_deref() == Some(wanted.as_str()))
        .ok_or_else(|| LoadError::MissingSymbol {
            symbol: symbol.to_string(),
            dir: dir.to_path_buf(),
        })
}
