//! ScreenLab Core: price series, indicator calculators, screening criteria.
//!
//! This crate holds everything that is pure computation:
//! - Domain types (price bars, per-symbol series, universes)
//! - Indicator calculators (RSI, EMA, MACD with crossover/divergence, SMA)
//! - The criteria model and its JSON wire shape
//! - Latest-bar snapshots and criteria evaluation
//!
//! Orchestration (worker pool, caching, data loading) lives in `screenlab-runner`.

pub mod criteria;
pub mod domain;
pub mod evaluate;
pub mod indicators;
pub mod snapshot;

pub use criteria::{
    Criteria, CriteriaError, Filters, MaCheck, MacdCondition, PriceRange, RsiCondition,
};
pub use domain::{PriceBar, PriceSeries, SeriesError, Symbol, Universe};
pub use evaluate::evaluate;
pub use indicators::{IndicatorSettings, IndicatorSpec, IndicatorValues, SignalDirection};
pub use snapshot::{IndicatorFamily, IndicatorSnapshot, MacdSnapshot, SnapshotPlan};
