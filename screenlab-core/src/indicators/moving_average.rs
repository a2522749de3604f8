//! Moving-average periods and their wire labels.

/// Periods reported in detail records unless configured otherwise.
pub const DEFAULT_MA_PERIODS: [usize; 3] = [20, 50, 200];

/// Display label used on the wire, e.g. `MA20`.
pub fn ma_label(period: usize) -> String {
    format!("MA{period}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_format() {
        assert_eq!(ma_label(20), "MA20");
        assert_eq!(ma_label(200), "MA200");
    }

    #[test]
    fn defaults_are_ascending() {
        assert!(DEFAULT_MA_PERIODS.windows(2).all(|w| w[0] < w[1]));
    }
}
