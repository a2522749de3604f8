//! One trading day of prices.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar.
///
/// The symbol lives on the owning [`PriceSeries`](super::PriceSeries). Only
/// `close` and `adj_close` have to be finite for screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Close and adjusted close are finite.
    pub fn has_usable_close(&self) -> bool {
        self.close.is_finite() && self.adj_close.is_finite()
    }

    /// `low <= open, close <= high`, all positive. Loaders log bars that fail
    /// this; screening does not reject them.
    pub fn ohlc_consistent(&self) -> bool {
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        self.has_usable_close() && self.low > 0.0 && self.low <= body_low && body_high <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aapl_day() -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open: 179.55,
            high: 180.53,
            low: 177.38,
            close: 179.66,
            adj_close: 179.21,
            volume: 73_488_000,
        }
    }

    #[test]
    fn consistent_day() {
        assert!(aapl_day().ohlc_consistent());
    }

    #[test]
    fn infinite_adj_close_is_unusable() {
        let bar = PriceBar {
            adj_close: f64::INFINITY,
            ..aapl_day()
        };
        assert!(!bar.has_usable_close());
        assert!(!bar.ohlc_consistent());
    }

    #[test]
    fn high_under_close_is_inconsistent_but_usable() {
        let bar = PriceBar {
            high: 179.0,
            ..aapl_day()
        };
        assert!(bar.has_usable_close());
        assert!(!bar.ohlc_consistent());
    }

    #[test]
    fn bar_deserializes_from_json() {
        let json = r#"{
            "date": "2024-01-02", "open": 1.0, "high": 2.0, "low": 0.5,
            "close": 1.5, "adj_close": 1.5, "volume": 10
        }"#;
        let bar: PriceBar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bar.volume, 10);
    }
}
