//! ScreenLab Runner: screening orchestration on top of `screenlab-core`.
//!
//! This crate provides:
//! - The parallel screening engine (`Screener::screen_with`, `Screener::analyze`)
//! - Indicator caches (in-memory and on-disk) behind one trait
//! - TOML configuration
//! - CSV universe loading
//! - Result shaping (symbol lists and detail records)
//! - Logging initialisation

pub mod cache;
pub mod config;
pub mod data_loader;
pub mod engine;
pub mod logging;
pub mod report;

pub use cache::{cache_from_config, DiskCache, IndicatorCache, IndicatorKey, MemoryCache};
pub use config::{
    CacheConfig, CacheMode, ConfigError, EngineConfig, LogFormat, LoggingConfig, ScreenerConfig,
};
pub use data_loader::{load_series, load_universe, LoadError, LoadedUniverse};
pub use engine::{request_id, ScreenError, Screener};
pub use logging::init_logging;
pub use report::{
    DetailRecord, Match, ScreenOutput, ScreeningResult, SkipReason, SkippedSymbol, Verbosity,
};
