//! Indicator calculators.
//!
//! Every calculator maps a bar series to an aligned output of the same length,
//! with `f64::NAN` wherever history is insufficient. MACD has one calculator
//! per band; [`IndicatorSpec`] is the parameterised handle the engine and the
//! cache work with.

pub mod ema;
pub mod indicator;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod sma;
pub mod spec;

pub use ema::ema_of_series;
pub use indicator::{Indicator, IndicatorValues};
pub use macd::{
    crossover_at, divergence_at, macd_of_series, recent_crossover, Macd, MacdBand, MacdSeries,
    SignalDirection,
};
pub use moving_average::{ma_label, DEFAULT_MA_PERIODS};
pub use rsi::{rsi_from_averages, rsi_of_series, Rsi};
pub use sma::{sma_of_series, Sma};
pub use spec::{IndicatorOutput, IndicatorSettings, IndicatorSpec};

/// Bars on consecutive days from closes. Each bar opens at the previous
/// close and has a one-point wick on both sides.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::PriceBar> {
    use crate::domain::PriceBar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                adj_close: close,
                volume: 1000,
            }
        })
        .collect()
}

/// Fails with both values when they differ by `epsilon` or more.
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "expected {expected}, got {actual} (off by {}, epsilon {epsilon})",
        (actual - expected).abs()
    );
}

/// Tolerance for exact-arithmetic fixtures.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
