//! Exponential moving average, the building block of MACD.
//!
//! `alpha = 2 / (span + 1)`. The first value sits at index `span - 1` and is
//! the plain mean of the first `span` inputs; each later value blends the
//! new input with the previous average.

/// EMA over an arbitrary series.
///
/// Once the average has started, an undefined input ends it: every later
/// value stays NaN. An undefined input inside the seed window means the
/// average never starts.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if span == 0 || values.len() < span {
        return out;
    }

    let seed_window = &values[..span];
    if seed_window.iter().any(|v| v.is_nan()) {
        return out;
    }
    let mut current = seed_window.iter().sum::<f64>() / span as f64;
    out[span - 1] = current;

    let alpha = 2.0 / (span as f64 + 1.0);
    for (slot, &x) in out[span..].iter_mut().zip(&values[span..]) {
        if x.is_nan() {
            break;
        }
        current = alpha * x + (1.0 - alpha) * current;
        *slot = current;
    }
    out
}
