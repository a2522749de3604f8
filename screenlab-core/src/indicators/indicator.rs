//! Calculator trait and the per-symbol table of computed series.

use crate::domain::PriceBar;
use std::collections::HashMap;

/// A calculator over one symbol's bars.
///
/// Output is aligned one-to-one with `bars`; the first `lookback()` entries
/// are `f64::NAN`. A value at bar t reads only bars 0..=t.
pub trait Indicator: Send + Sync {
    /// Canonical key, e.g. `rsi(14)` or `macd(12,26,9).signal`.
    fn name(&self) -> &str;

    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Computed series for one symbol, keyed by series name.
///
/// Filled once per symbol from the calculators or the cache, then read by
/// bar index while the snapshot is built.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a series under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Raw value at `bar_index`, NaN included.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series.get(name)?.get(bar_index).copied()
    }

    /// Value at `bar_index` only when it is finite.
    pub fn get_defined(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.get(name, bar_index).filter(|v| v.is_finite())
    }

    /// Whole series, aligned to the bars.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }

    /// Whether a series named `name` has been stored.
    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Number of stored series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_skips_warmup() {
        let mut values = IndicatorValues::new();
        values.insert("rsi(2)", vec![f64::NAN, f64::NAN, 75.0]);

        assert!(values.get("rsi(2)", 1).is_some_and(f64::is_nan));
        assert_eq!(values.get_defined("rsi(2)", 1), None);
        assert_eq!(values.get_defined("rsi(2)", 2), Some(75.0));
        assert_eq!(values.get("rsi(2)", 3), None);
    }

    #[test]
    fn unknown_series() {
        let values = IndicatorValues::new();
        assert_eq!(values.get_defined("sma(20)", 0), None);
        assert!(values.get_series("sma(20)").is_none());
        assert!(!values.contains("sma(20)"));
    }

    #[test]
    fn counts_series_not_points() {
        let mut values = IndicatorValues::new();
        assert!(values.is_empty());
        values.insert("sma(20)", vec![1.0; 30]);
        values.insert("sma(50)", vec![1.0; 30]);
        values.insert("sma(20)", vec![2.0; 30]);
        assert_eq!(values.len(), 2);
        assert_eq!(values.get_series("sma(20)").map(|s| s[0]), Some(2.0));
    }
}
