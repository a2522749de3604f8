//! Moving Average Convergence Divergence (MACD).
//!
//! Three series (separate Indicator instances, like other multi-band indicators):
//! - Line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(line, signal), computed over the defined part of the line
//! - Histogram: line - signal
//!
//! EMAs are seeded with the simple mean of their first `span` inputs, so the
//! line is defined from index slow-1 and signal/histogram from slow+signal-2.

use serde::{Deserialize, Serialize};

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::PriceBar;

/// Direction of a MACD crossover or divergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    Bullish,
    Bearish,
}

/// Which series of the MACD triple to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdBand {
    Line,
    Signal,
    Histogram,
}

/// Aligned MACD line, signal line and histogram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl MacdSeries {
    /// Number of bars covered.
    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }
}

/// MACD calculator for one band (line, signal or histogram).
#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    band: MacdBand,
    name: String,
}

impl Macd {
    fn with_band(fast: usize, slow: usize, signal: usize, band: MacdBand) -> Self {
        let band_name = match band {
            MacdBand::Line => "line",
            MacdBand::Signal => "signal",
            MacdBand::Histogram => "histogram",
        };
        Self {
            fast,
            slow,
            signal,
            band,
            name: format!("macd({fast},{slow},{signal}).{band_name}"),
        }
    }

    /// Calculator yielding `fast EMA - slow EMA`.
    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_band(fast, slow, signal, MacdBand::Line)
    }

    /// Calculator yielding the EMA of the MACD line.
    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_band(fast, slow, signal, MacdBand::Signal)
    }

    /// Calculator yielding line minus signal.
    pub fn histogram(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_band(fast, slow, signal, MacdBand::Histogram)
    }

    /// All three series in one pass.
    pub fn compute_all(&self, bars: &[PriceBar]) -> MacdSeries {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        macd_of_series(&closes, self.fast, self.slow, self.signal)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let line = self.fast.max(self.slow) - 1;
        match self.band {
            MacdBand::Line => line,
            MacdBand::Signal | MacdBand::Histogram => line + self.signal - 1,
        }
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let all = self.compute_all(bars);
        match self.band {
            MacdBand::Line => all.macd,
            MacdBand::Signal => all.signal,
            MacdBand::Histogram => all.histogram,
        }
    }
}

/// MACD over a raw close series.
pub fn macd_of_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let n = closes.len();
    let fast_ema = ema_of_series(closes, fast);
    let slow_ema = ema_of_series(closes, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let mut signal_line = vec![f64::NAN; n];
    if let Some(first) = macd.iter().position(|v| !v.is_nan()) {
        let tail = ema_of_series(&macd[first..], signal);
        signal_line[first..].copy_from_slice(&tail);
    }

    let histogram = macd
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    MacdSeries {
        macd,
        signal: signal_line,
        histogram,
    }
}

/// Bullish: line at or below signal on bar i-1 and strictly above on bar i.
/// Bearish is the mirror. `None` if any of the four values is undefined.
pub fn crossover_at(macd: &[f64], signal: &[f64], i: usize) -> Option<SignalDirection> {
    if i == 0 || i >= macd.len() || i >= signal.len() {
        return None;
    }
    let (m0, s0, m1, s1) = (macd[i - 1], signal[i - 1], macd[i], signal[i]);
    if !(m0.is_finite() && s0.is_finite() && m1.is_finite() && s1.is_finite()) {
        return None;
    }
    if m0 <= s0 && m1 > s1 {
        Some(SignalDirection::Bullish)
    } else if m0 >= s0 && m1 < s1 {
        Some(SignalDirection::Bearish)
    } else {
        None
    }
}

/// Most recent crossover among the last `window` bar pairs ending at `i`.
pub fn recent_crossover(
    macd: &[f64],
    signal: &[f64],
    i: usize,
    window: usize,
) -> Option<SignalDirection> {
    (0..window)
        .take_while(|&back| back < i)
        .find_map(|back| crossover_at(macd, signal, i - back))
}

/// Price and MACD line moving in opposite directions over `lookback` bars.
///
/// Bullish: close fell while the line rose. Bearish: close rose while the line
/// fell. A flat leg on either side is not a divergence.
pub fn divergence_at(
    closes: &[f64],
    macd: &[f64],
    i: usize,
    lookback: usize,
) -> Option<SignalDirection> {
    if lookback == 0 || i < lookback || i >= closes.len() || i >= macd.len() {
        return None;
    }
    let price_move = closes[i] - closes[i - lookback];
    let macd_move = macd[i] - macd[i - lookback];
    if !(price_move.is_finite() && macd_move.is_finite()) {
        return None;
    }
    if price_move < 0.0 && macd_move > 0.0 {
        Some(SignalDirection::Bullish)
    } else if price_move > 0.0 && macd_move < 0.0 {
        Some(SignalDirection::Bearish)
    } else {
        None
    }
}
