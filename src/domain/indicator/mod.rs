//! Indicator engine: RSI, short/long moving averages and MACD over a price series.
//!
//! - `IndicatorParams`: window lengths, with the conventional defaults
//! - `IndicatorRecord`: one fully warmed-up row
//! - `IndicatorSeries`: the rows that survive warm-up, aligned to their bars
//! - `compute`: the engine entry point

pub mod ema;
pub mod macd;
pub mod rsi;

use crate::domain::error::InputError;
use crate::domain::price::{validate_series, PriceBar};
use crate::domain::window::sma;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub ma_short: usize,
    pub ma_long: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: rsi::DEFAULT_PERIOD,
            ma_short: 20,
            ma_long: 50,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
        }
    }
}

impl IndicatorParams {
    /// Number of bars needed before the first row is emitted.
    pub fn warmup(&self) -> usize {
        self.rsi_period.max(self.ma_short).max(self.ma_long)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("ma_short", self.ma_short),
            ("ma_long", self.ma_long),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(InputError::InvalidParameter {
                    name,
                    reason: "period must be at least 1".into(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for IndicatorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RSI({}) MA({},{}) MACD({},{})",
            self.rsi_period, self.ma_short, self.ma_long, self.macd_fast, self.macd_slow
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub rsi: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub macd: f64,
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub ticker: String,
    pub params: IndicatorParams,
    pub records: Vec<IndicatorRecord>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Computes every indicator for `bars` and keeps only rows where RSI and
/// both moving averages are defined. A series shorter than the warm-up
/// yields an empty result rather than an error.
pub fn compute(
    ticker: &str,
    bars: &[PriceBar],
    params: &IndicatorParams,
) -> Result<IndicatorSeries, InputError> {
    params.validate()?;
    validate_series(ticker, bars)?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let rsi = rsi::calculate_rsi(&closes, params.rsi_period);
    let ma_short = sma(&closes, params.ma_short);
    let ma_long = sma(&closes, params.ma_long);
    let macd = macd::calculate_macd(&closes, params.macd_fast, params.macd_slow);

    let records: Vec<IndicatorRecord> = bars
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            Some(IndicatorRecord {
                date: bar.date,
                close: bar.close,
                volume: bar.volume,
                rsi: rsi[i]?,
                ma_short: ma_short[i]?,
                ma_long: ma_long[i]?,
                macd: macd[i],
            })
        })
        .collect();

    tracing::debug!(
        ticker,
        bars = bars.len(),
        rows = records.len(),
        params = %params,
        "computed indicators"
    );

    Ok(IndicatorSeries {
        ticker: ticker.to_string(),
        params: *params,
        records,
    })
}
