//! Relative strength index on closes.
//!
//! Plain means over the last `period` close-to-close moves (no Wilder
//! smoothing): `100 - 100 / (1 + gain / loss)`. Needs `period + 1` closes,
//! so the first value lands on index `period`. A window with no movement
//! reads 50, one with no losses 100, one with no gains 0.

use super::Indicator;
use crate::domain::PriceBar;

/// RSI calculator over closes.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    /// RSI over the last `period` moves. Period 0 yields no values.
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("rsi({period})"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rsi_of_series(&closes, self.period)
    }
}

/// RSI over a raw close series.
///
/// Each window is summed from scratch rather than rolled, so a window that
/// contains no losses always yields exactly 100 regardless of earlier history.
pub fn rsi_of_series(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // changes[j] is the move into bar j + 1
    for i in period..n {
        let window = &changes[(i - period)..i];
        if window.iter().any(|c| c.is_nan()) {
            continue;
        }
        let (gain, loss) = window.iter().fold((0.0, 0.0), |(g, l), &c| {
            if c > 0.0 {
                (g + c, l)
            } else {
                (g, l - c)
            }
        });
        result[i] = rsi_from_averages(gain / period as f64, loss / period as f64);
    }

    result
}

/// Map average gain/loss to the bounded RSI value. Total for all finite inputs.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // flat market
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
