//! Screener configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [indicators]
//! rsi_period = 14
//! macd_fast = 12
//! macd_slow = 26
//! macd_signal = 9
//! ma_periods = [20, 50, 200]
//! divergence_lookback = 5
//! crossover_window = 1
//!
//! [engine]
//! workers = 0          # 0 = one per available core
//!
//! [cache]
//! mode = "memory"      # none | memory | disk
//! dir = ".screenlab-cache"
//!
//! [logging]
//! format = "pretty"    # pretty | json
//! filter = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use screenlab_core::IndicatorSettings;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for a [`Screener`](crate::Screener) and the CLI around it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenerConfig {
    pub indicators: IndicatorSettings,
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl ScreenerConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScreenerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check indicator parameters. Called by `from_toml`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicators
            .validate()
            .map_err(|reason| ConfigError::Invalid(format!("indicators: {reason}")))?;
        if self.cache.mode == CacheMode::Disk && self.cache.dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("cache.dir must be set for disk mode".into()));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".into()));
        }
        Ok(())
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker threads for per-symbol computation; 0 means one per available core.
    pub workers: usize,
}

impl EngineConfig {
    /// Configured workers, or the available cores when 0.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Which indicator cache sits in front of the calculators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    None,
    #[default]
    Memory,
    Disk,
}

/// Indicator cache selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub mode: CacheMode,
    /// Directory for the disk cache. Unused in other modes.
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::Memory,
            dir: PathBuf::from(".screenlab-cache"),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Subscriber settings; see [`crate::logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".into(),
        }
    }
}
