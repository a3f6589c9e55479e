//! Trailing-window reducer over an ordered sequence.
//!
//! `trailing(values, n, f)[i]` is `f(&values[i + 1 - n..=i])` once `n` values
//! have been observed and `None` before that. There is no look-ahead and no
//! partial-window evaluation.

pub fn trailing<F>(values: &[f64], period: usize, reduce: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                Some(reduce(&values[i + 1 - period..=i]))
            }
        })
        .collect()
}

/// Arithmetic mean of a window.
pub fn mean(window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Simple moving average of `values` over `period`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    trailing(values, period, mean)
}
