//! Simple moving average of closes.
//!
//! First defined value at index `period - 1`. Each window is summed on its
//! own, so a value never carries rounding from bars outside its window.

use super::Indicator;
use crate::domain::PriceBar;

/// SMA calculator over closes.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("sma({period})"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        sma_of_series(&closes, self.period)
    }
}

/// Trailing mean over a raw series. A window with any non-finite value is
/// undefined; period 0 yields an all-undefined series.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for (start, window) in values.windows(period).enumerate() {
        if window.iter().all(|v| v.is_finite()) {
            out[start + period - 1] = window.iter().sum::<f64>() / period as f64;
        }
    }
    out
}
