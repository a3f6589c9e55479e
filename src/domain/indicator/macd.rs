//! MACD (Moving Average Convergence Divergence).
//!
//! MACD = EMA(fast) - EMA(slow), both seeded with the first close, so the line
//! is defined from the first bar.

use crate::domain::indicator::ema::calculate_ema;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    if closes.is_empty() || fast == 0 || slow == 0 {
        return Vec::new();
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect()
}
