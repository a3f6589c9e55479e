//! Threshold rules turning indicator rows into BUY/SELL signals.

use crate::domain::indicator::{IndicatorRecord, IndicatorSeries};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_BUY_BELOW: f64 = 30.0;
pub const DEFAULT_SELL_ABOVE: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Signal::Buy),
            "SELL" => Ok(Signal::Sell),
            other => Err(format!("unknown signal label '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub buy_below: f64,
    pub sell_above: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            buy_below: DEFAULT_BUY_BELOW,
            sell_above: DEFAULT_SELL_ABOVE,
        }
    }
}

impl SignalThresholds {
    pub fn classify(&self, rsi: f64) -> Option<Signal> {
        if rsi < self.buy_below {
            Some(Signal::Buy)
        } else if rsi > self.sell_above {
            Some(Signal::Sell)
        } else {
            None
        }
    }
}

/// A bar on which a rule fired. Values are unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub rsi: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub macd: f64,
    pub volume: f64,
    pub label: Signal,
}

impl SignalRecord {
    fn from_indicator(ticker: &str, record: &IndicatorRecord, label: Signal) -> Self {
        Self {
            ticker: ticker.to_string(),
            date: record.date,
            close: record.close,
            rsi: record.rsi,
            ma_short: record.ma_short,
            ma_long: record.ma_long,
            macd: record.macd,
            volume: record.volume,
            label,
        }
    }

    /// The presentation row handed to the ledger sink.
    pub fn to_row(&self) -> SignalRow {
        SignalRow {
            ticker: self.ticker.clone(),
            date: self.date.format("%Y-%m-%d").to_string(),
            close: Some(round_to(self.close, 2)),
            rsi: Some(round_to(self.rsi, 2)),
            ma_short: Some(round_to(self.ma_short, 2)),
            ma_long: Some(round_to(self.ma_long, 2)),
            macd: Some(round_to(self.macd, 4)),
            volume: Some(self.volume),
            label: self.label.to_string(),
        }
    }
}

/// A signal as stored by the ledger sink. Rows read back from storage may be
/// partial, so every numeric field is optional and the date and label are
/// kept as text.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub ticker: String,
    pub date: String,
    pub close: Option<f64>,
    pub rsi: Option<f64>,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub macd: Option<f64>,
    pub volume: Option<f64>,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct SignalSeries {
    pub ticker: String,
    pub records: Vec<SignalRecord>,
}

impl SignalSeries {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// (BUY count, SELL count)
    pub fn counts(&self) -> (usize, usize) {
        let buys = self
            .records
            .iter()
            .filter(|r| r.label == Signal::Buy)
            .count();
        (buys, self.records.len() - buys)
    }

    pub fn rows(&self) -> Vec<SignalRow> {
        self.records.iter().map(SignalRecord::to_row).collect()
    }
}

/// Labels every indicator row whose RSI crosses a threshold. Rows between the
/// thresholds (inclusive) are dropped. Consecutive identical labels are kept.
pub fn label(series: &IndicatorSeries, thresholds: &SignalThresholds) -> SignalSeries {
    let records: Vec<SignalRecord> = series
        .records
        .iter()
        .filter_map(|record| {
            thresholds
                .classify(record.rsi)
                .map(|signal| SignalRecord::from_indicator(&series.ticker, record, signal))
        })
        .collect();

    let out = SignalSeries {
        ticker: series.ticker.clone(),
        records,
    };

    let (buys, sells) = out.counts();
    tracing::info!(ticker = %series.ticker, buys, sells, "labelled signals");
    if out.is_empty() {
        tracing::info!(ticker = %series.ticker, "no signals generated");
    }

    out
}

/// Rounds to `places` decimals, exact halves to even (0.125 -> 0.12).
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}
