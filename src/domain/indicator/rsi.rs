//! RSI (Relative Strength Index) over simple trailing averages.
//!
//! The close-to-close change series starts with 0 (no prior close). Average
//! gain and average loss are plain trailing means over `period` changes, so
//! RSI is first defined at index `period - 1`.
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RS is taken as 0, so RSI = 0 (not 100).

use crate::domain::window::sma;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());

    for (i, &close) in closes.iter().enumerate() {
        let change = if i == 0 { 0.0 } else { close - closes[i - 1] };
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let avg_gain = sma(&gains, period);
    let avg_loss = sma(&losses, period);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(gain, loss)| Some(rsi_from_averages(gain?, loss?)))
        .collect()
}

pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    // An infinite RS collapses to 0; this keeps flat and all-gain windows at RSI 0.
    let rs = if avg_loss == 0.0 {
        0.0
    } else {
        avg_gain / avg_loss
    };
    100.0 - (100.0 / (1.0 + rs))
}
