//! Indicator parameterisation and canonical keys.
//!
//! An [`IndicatorSpec`] names one calculator with its parameters. Its
//! canonical key (`rsi(14)`, `macd(12,26,9)`, `sma(50)`) identifies the
//! variant in cache keys and in [`IndicatorValues`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::macd::{Macd, MacdSeries};
use super::moving_average::DEFAULT_MA_PERIODS;
use super::rsi::Rsi;
use super::sma::Sma;
use super::{Indicator, IndicatorValues};
use crate::domain::PriceBar;

/// One indicator calculator with concrete parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Sma { period: usize },
}

impl IndicatorSpec {
    /// Canonical parameter key.
    pub fn key(&self) -> String {
        match self {
            IndicatorSpec::Rsi { period } => format!("rsi({period})"),
            IndicatorSpec::Macd { fast, slow, signal } => format!("macd({fast},{slow},{signal})"),
            IndicatorSpec::Sma { period } => format!("sma({period})"),
        }
    }

    /// Series names this spec contributes to [`IndicatorValues`].
    pub fn series_names(&self) -> Vec<String> {
        match self {
            IndicatorSpec::Macd { .. } => {
                let key = self.key();
                vec![
                    format!("{key}.line"),
                    format!("{key}.signal"),
                    format!("{key}.histogram"),
                ]
            }
            _ => vec![self.key()],
        }
    }

    /// Run the calculator over a bar series.
    pub fn compute(&self, bars: &[PriceBar]) -> IndicatorOutput {
        match *self {
            IndicatorSpec::Rsi { period } => {
                IndicatorOutput::Series(Rsi::new(period).compute(bars))
            }
            IndicatorSpec::Macd { fast, slow, signal } => {
                IndicatorOutput::Macd(Macd::line(fast, slow, signal).compute_all(bars))
            }
            IndicatorSpec::Sma { period } => {
                IndicatorOutput::Series(Sma::new(period).compute(bars))
            }
        }
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Result of one calculator run, aligned to the input bars.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutput {
    Series(Vec<f64>),
    Macd(MacdSeries),
}

impl IndicatorOutput {
    /// Number of bars covered.
    pub fn len(&self) -> usize {
        match self {
            IndicatorOutput::Series(v) => v.len(),
            IndicatorOutput::Macd(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the output has the shape `spec` produces.
    pub fn matches_spec(&self, spec: &IndicatorSpec) -> bool {
        matches!(
            (self, spec),
            (IndicatorOutput::Macd(_), IndicatorSpec::Macd { .. })
                | (IndicatorOutput::Series(_), IndicatorSpec::Rsi { .. })
                | (IndicatorOutput::Series(_), IndicatorSpec::Sma { .. })
        )
    }

    /// Insert under the names returned by [`IndicatorSpec::series_names`].
    pub fn store(self, spec: &IndicatorSpec, values: &mut IndicatorValues) {
        match self {
            IndicatorOutput::Series(v) => values.insert(spec.key(), v),
            IndicatorOutput::Macd(m) => {
                let key = spec.key();
                values.insert(format!("{key}.line"), m.macd);
                values.insert(format!("{key}.signal"), m.signal);
                values.insert(format!("{key}.histogram"), m.histogram);
            }
        }
    }
}

/// Indicator parameters used by one screening engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorSettings {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Periods always reported in detail records.
    pub ma_periods: Vec<usize>,
    /// Bars between the two points compared for MACD divergence.
    pub divergence_lookback: usize,
    /// Number of trailing bar pairs searched for a MACD crossover.
    pub crossover_window: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            ma_periods: DEFAULT_MA_PERIODS.to_vec(),
            divergence_lookback: 5,
            crossover_window: 1,
        }
    }
}

impl IndicatorSettings {
    /// RSI with the configured period.
    pub fn rsi(&self) -> IndicatorSpec {
        IndicatorSpec::Rsi {
            period: self.rsi_period,
        }
    }

    /// MACD with the configured spans.
    pub fn macd(&self) -> IndicatorSpec {
        IndicatorSpec::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    /// SMA over `period` bars.
    pub fn sma(&self, period: usize) -> IndicatorSpec {
        IndicatorSpec::Sma { period }
    }

    /// Human-readable description of the first invalid parameter, if any.
    pub fn validate(&self) -> Result<(), String> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("divergence_lookback", self.divergence_lookback),
            ("crossover_window", self.crossover_window),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, v)| *v == 0) {
            return Err(format!("{name} must be >= 1"));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(format!(
                "macd_fast ({}) must be smaller than macd_slow ({})",
                self.macd_fast, self.macd_slow
            ));
        }
        if self.ma_periods.contains(&0) {
            return Err("ma_periods must all be >= 1".into());
        }
        Ok(())
    }
}
