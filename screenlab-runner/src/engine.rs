//! Screening engine: per-symbol indicator computation fanned out over a
//! Rayon pool, with an optional cache in front of the calculators.
//!
//! Per symbol, in universe order:
//! 1. Pre-filter on the latest bar (`min_volume`, `price_range`)
//! 2. Fetch or compute every indicator the plan needs
//! 3. Build the latest usable snapshot; none means insufficient history
//! 4. Evaluate the criteria
//!
//! Data problems in one symbol never fail the batch. Only bad criteria,
//! bad settings and cancellation surface as request-level errors.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use screenlab_core::indicators::IndicatorOutput;
use screenlab_core::{
    evaluate, Criteria, CriteriaError, IndicatorFamily, IndicatorSettings, IndicatorSnapshot,
    IndicatorSpec, IndicatorValues, PriceSeries, SeriesError, SnapshotPlan, Universe,
};

use crate::cache::{IndicatorCache, IndicatorKey};
use crate::config::{ConfigError, ScreenerConfig};
use crate::report::{Match, ScreeningResult, SkipReason, SkippedSymbol, Verbosity};

/// Request-level failures.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("invalid criteria: {0}")]
    Criteria(#[from] CriteriaError),

    #[error("stock '{symbol}' not found in the universe")]
    StockNotFound { symbol: String },

    #[error("'{symbol}' has insufficient history for the requested indicators")]
    InsufficientHistory { symbol: String },

    #[error("'{symbol}' has an unusable series: {source}")]
    Series {
        symbol: String,
        #[source]
        source: SeriesError,
    },

    #[error("screening cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Per-symbol result before collation.
enum Outcome {
    Matched(IndicatorSnapshot),
    Rejected,
    Skipped(SkipReason),
    Cancelled,
}

/// Deterministic id for a screening request: BLAKE3 over the canonical
/// criteria and the indicator settings.
pub fn request_id(criteria: &Criteria, settings: &IndicatorSettings) -> String {
    let canonical = serde_json::json!({
        "criteria": criteria.to_value(),
        "settings": settings,
    });
    blake3::hash(canonical.to_string().as_bytes())
        .to_hex()
        .to_string()
}

/// Screens universes against criteria. Stateless between calls apart from
/// the shared cache, so one instance can serve concurrent requests.
pub struct Screener {
    settings: IndicatorSettings,
    pool: rayon::ThreadPool,
    cache: Option<Arc<dyn IndicatorCache>>,
}

impl Screener {
    /// Validate the indicator settings and build the worker pool.
    pub fn new(
        config: &ScreenerConfig,
        cache: Option<Arc<dyn IndicatorCache>>,
    ) -> Result<Self, ScreenError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.engine.worker_count())
            .thread_name(|i| format!("screenlab-worker-{i}"))
            .build()?;
        Ok(Self {
            settings: config.indicators.clone(),
            pool,
            cache,
        })
    }

    /// Indicator parameters every request on this screener uses.
    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    /// Threads in the screening pool.
    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Screen with symbol-list verbosity and no cancellation.
    pub fn screen(
        &self,
        criteria: &Criteria,
        universe: &Universe,
    ) -> Result<ScreeningResult, ScreenError> {
        self.screen_with(criteria, universe, Verbosity::Symbols, None)
    }

    /// Screen the universe.
    ///
    /// With [`Verbosity::Detailed`] the default indicator set is computed for
    /// every evaluated symbol so match snapshots carry full detail; matching
    /// itself is unaffected. `cancel` is checked once per symbol.
    pub fn screen_with(
        &self,
        criteria: &Criteria,
        universe: &Universe,
        verbosity: Verbosity,
        cancel: Option<&AtomicBool>,
    ) -> Result<ScreeningResult, ScreenError> {
        let start = Instant::now();
        let request_id = request_id(criteria, &self.settings);
        let plan = SnapshotPlan::for_criteria(criteria, &self.settings, verbosity.is_detailed());

        let outcomes: Vec<Outcome> = self.pool.install(|| {
            universe
                .as_slice()
                .par_iter()
                .map(|series| {
                    if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                        return Outcome::Cancelled;
                    }
                    self.screen_symbol(criteria, &plan, series)
                })
                .collect()
        });

        let mut result = ScreeningResult {
            request_id,
            matches: Vec::new(),
            skipped: Vec::new(),
            evaluated: 0,
        };
        for (series, outcome) in universe.iter().zip(outcomes) {
            let symbol = series.symbol().to_string();
            match outcome {
                Outcome::Cancelled => {
                    info!(request_id = %result.request_id, "screening cancelled");
                    return Err(ScreenError::Cancelled);
                }
                Outcome::Matched(snapshot) => {
                    result.evaluated += 1;
                    result.matches.push(Match { symbol, snapshot });
                }
                Outcome::Rejected => result.evaluated += 1,
                Outcome::Skipped(reason) => {
                    result.skipped.push(SkippedSymbol { symbol, reason });
                }
            }
        }

        info!(
            request_id = %result.request_id,
            universe = universe.len(),
            matches = result.matches.len(),
            skipped = result.skipped.len(),
            faults = result.faults().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "screening complete"
        );
        Ok(result)
    }

    fn screen_symbol(
        &self,
        criteria: &Criteria,
        plan: &SnapshotPlan,
        series: &PriceSeries,
    ) -> Outcome {
        let symbol = series.symbol();

        if let Err(e) = series.check_usable() {
            return match e {
                SeriesError::Empty { .. } => {
                    debug!(symbol, "skipped: empty series");
                    Outcome::Skipped(SkipReason::InsufficientHistory)
                }
                other => {
                    warn!(symbol, error = %other, "skipped: unusable series");
                    Outcome::Skipped(SkipReason::Fault(other.to_string()))
                }
            };
        }

        if let Some(latest) = series.latest() {
            if !criteria.filters.admits(latest) {
                debug!(symbol, "skipped: pre-filter");
                return Outcome::Skipped(SkipReason::FilteredOut);
            }
        }

        let values = self.indicator_values(series, plan.specs_to_compute());
        let Some(snapshot) = plan.build(series, &values) else {
            debug!(symbol, "skipped: insufficient history");
            return Outcome::Skipped(SkipReason::InsufficientHistory);
        };

        if evaluate(criteria, &snapshot) {
            debug!(symbol, date = %snapshot.date, "matched");
            Outcome::Matched(snapshot)
        } else {
            debug!(symbol, date = %snapshot.date, "not matched");
            Outcome::Rejected
        }
    }

    /// Single-symbol analysis: the snapshot with the requested families
    /// (all of them when `families` is empty).
    ///
    /// Unlike screening, a symbol without any usable value is an error here
    /// since the caller asked for it by name.
    pub fn analyze(
        &self,
        symbol: &str,
        families: &[IndicatorFamily],
        universe: &Universe,
    ) -> Result<IndicatorSnapshot, ScreenError> {
        let series = universe.get(symbol).ok_or_else(|| ScreenError::StockNotFound {
            symbol: symbol.to_string(),
        })?;

        match series.check_usable() {
            Ok(()) => {}
            Err(SeriesError::Empty { .. }) => {
                return Err(ScreenError::InsufficientHistory {
                    symbol: symbol.to_string(),
                })
            }
            Err(source) => {
                return Err(ScreenError::Series {
                    symbol: symbol.to_string(),
                    source,
                })
            }
        }

        let all = IndicatorFamily::ALL;
        let families = if families.is_empty() { &all[..] } else { families };
        let plan = SnapshotPlan::for_families(families, &self.settings);
        let values = self.indicator_values(series, plan.specs_to_compute());
        let snapshot = plan
            .build(series, &values)
            .filter(|s| s.rsi.is_some() || s.macd.is_some() || !s.moving_averages.is_empty())
            .ok_or_else(|| ScreenError::InsufficientHistory {
                symbol: symbol.to_string(),
            })?;

        debug!(symbol, date = %snapshot.date, "analyzed");
        Ok(snapshot)
    }

    fn indicator_values(&self, series: &PriceSeries, specs: &[IndicatorSpec]) -> IndicatorValues {
        let mut values = IndicatorValues::new();
        let Some(as_of) = series.last_date() else {
            return values;
        };

        for spec in specs {
            let key = IndicatorKey::new(series.symbol(), as_of, *spec);
            let output = match self.cached(&key, series.len()) {
                Some(output) => output,
                None => {
                    let output = spec.compute(series.bars());
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(&key, &output) {
                            warn!(
                                key = %key.canonical(),
                                cache = cache.label(),
                                error = %e,
                                "cache write failed"
                            );
                        }
                    }
                    output
                }
            };
            output.store(spec, &mut values);
        }
        values
    }

    /// A cache hit that fits the current series, or `None`.
    fn cached(&self, key: &IndicatorKey, bars: usize) -> Option<IndicatorOutput> {
        let cache = self.cache.as_ref()?;
        match cache.get(key) {
            Ok(Some(output)) if output.len() == bars && output.matches_spec(&key.spec) => {
                Some(output)
            }
            Ok(Some(_)) => {
                debug!(key = %key.canonical(), "stale cache entry ignored");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    key = %key.canonical(),
                    cache = cache.label(),
                    error = %e,
                    "cache read failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use screenlab_core::{PriceBar, RsiCondition};

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: base + chrono::Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                adj_close: c,
                volume: 10_000,
            })
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    fn screener(cache: Option<Arc<dyn IndicatorCache>>) -> Screener {
        let mut config = ScreenerConfig::default();
        config.engine.workers = 2;
        Screener::new(&config, cache).unwrap()
    }

    #[test]
    fn request_id_is_stable_and_content_addressed() {
        let settings = IndicatorSettings::default();
        let a = Criteria::default().with_rsi(RsiCondition::below(30.0));
        let b = Criteria::default().with_rsi(RsiCondition::below(30.0));
        let c = Criteria::default().with_rsi(RsiCondition::below(31.0));
        assert_eq!(request_id(&a, &settings), request_id(&b, &settings));
        assert_ne!(request_id(&a, &settings), request_id(&c, &settings));
        assert_eq!(request_id(&a, &settings).len(), 64);
    }

    #[test]
    fn takes_settings_and_workers_from_config() {
        let mut config = ScreenerConfig::default();
        config.engine.workers = 3;
        config.indicators.rsi_period = 7;
        let screener = Screener::new(&config, None).unwrap();
        assert_eq!(screener.worker_count(), 3);
        assert_eq!(screener.settings().rsi_period, 7);
        assert_eq!(screener.settings().macd_slow, 26);
    }

    #[test]
    fn invalid_settings_fail_construction() {
        let mut config = ScreenerConfig::default();
        config.indicators.macd_fast = 40;
        assert!(matches!(Screener::new(&config, None), Err(ScreenError::Config(_))));
    }

    #[test]
    fn cache_is_populated_and_reused() {
        let cache = Arc::new(MemoryCache::new());
        let screener = screener(Some(cache.clone()));
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let universe: Universe = vec![series("UP", &closes)].into_iter().collect();
        let criteria = Criteria::default().with_rsi(RsiCondition::above(70.0));

        let first = screener.screen(&criteria, &universe).unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        let second = screener.screen(&criteria, &universe).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.symbols(), vec!["UP"]);
    }

    #[test]
    fn stale_entry_is_recomputed() {
        let cache = Arc::new(MemoryCache::new());
        let screener = screener(Some(cache.clone()));
        let s = series("UP", &(0..30).map(|i| 10.0 + i as f64).collect::<Vec<_>>());
        let key =
            IndicatorKey::new("UP", s.last_date().unwrap(), IndicatorSpec::Rsi { period: 14 });
        cache
            .put(&key, &IndicatorOutput::Series(vec![0.0; 3]))
            .unwrap();

        let universe: Universe = vec![s].into_iter().collect();
        let criteria = Criteria::default().with_rsi(RsiCondition::above(70.0));
        let result = screener.screen(&criteria, &universe).unwrap();
        assert_eq!(result.symbols(), vec!["UP"]);
    }
}
