//! Trade reconciliation: pairs BUY/SELL signals from a ticker's accumulated
//! history into closed trades and aggregates realized P&L.
//!
//! The history is normalized first (label, date and close are parsed; rows that
//! fail are skipped and recorded), stable-sorted by date, then scanned through
//! the FLAT/LONG machine in [`crate::domain::position`]. The result is a pure
//! function of the input rows, so rerunning on the same history reproduces the
//! same ledger and summary.

use crate::domain::position::{OpenPosition, PositionState, Trade, Transition};
use crate::domain::signal::{round_to, Signal, SignalRow};
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingClose,
    UnknownLabel(String),
    InvalidDate(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSignal {
    /// Position of the row in the input slice.
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLedger {
    pub trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn winning_trades(&self) -> usize {
        self.trades.iter().filter(|t| t.is_win()).count()
    }

    pub fn total_profit(&self) -> f64 {
        self.trades.iter().map(|t| t.profit).sum()
    }

    /// Mean calendar days between entry and exit, `None` without trades.
    pub fn average_holding_days(&self) -> Option<f64> {
        if self.trades.is_empty() {
            return None;
        }
        let days: i64 = self.trades.iter().map(Trade::holding_days).sum();
        Some(days as f64 / self.trades.len() as f64)
    }
}

/// How a position still open at the end of history is reported.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OpenPositionPolicy {
    #[default]
    Exclude,
    MarkToMarket { price: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlSummary {
    pub ticker: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    /// winning_trades / total_trades, 0 when there are no trades.
    pub win_ratio: f64,
    /// Classifier accuracy in [0, 1], passed through unchanged.
    pub model_accuracy: f64,
    /// Realized profit only.
    pub total_profit: f64,
    pub unrealized_profit: Option<f64>,
}

impl PlSummary {
    pub fn to_row(&self) -> SummaryRow {
        SummaryRow {
            ticker: self.ticker.clone(),
            total_trades: self.total_trades,
            winning_trades: self.winning_trades,
            win_ratio_percent: round_to(self.win_ratio * 100.0, 2),
            model_accuracy_percent: round_to(self.model_accuracy * 100.0, 2),
            total_profit: round_to(self.total_profit, 2),
            unrealized_profit: self.unrealized_profit.map(|p| round_to(p, 2)),
        }
    }
}

/// P&L summary as stored by the ledger sink, keyed by ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub ticker: String,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_ratio_percent: f64,
    pub model_accuracy_percent: f64,
    pub total_profit: f64,
    pub unrealized_profit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub ticker: String,
    pub ledger: TradeLedger,
    pub open_position: Option<OpenPosition>,
    pub skipped: Vec<SkippedSignal>,
    /// BUYs while LONG and SELLs while FLAT.
    pub ignored: usize,
}

impl Reconciliation {
    pub fn summary(&self, model_accuracy: f64, policy: OpenPositionPolicy) -> PlSummary {
        let total_trades = self.ledger.len();
        let winning_trades = self.ledger.winning_trades();
        let win_ratio = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let unrealized_profit = match policy {
            OpenPositionPolicy::Exclude => None,
            OpenPositionPolicy::MarkToMarket { price } => self
                .open_position
                .map(|pos| pos.unrealized_profit(price)),
        };

        PlSummary {
            ticker: self.ticker.clone(),
            total_trades,
            winning_trades,
            win_ratio,
            model_accuracy,
            total_profit: self.ledger.total_profit(),
            unrealized_profit,
        }
    }
}

struct Event {
    date: NaiveDate,
    signal: Signal,
    close: f64,
}

pub fn reconcile(ticker: &str, signals: &[SignalRow]) -> Reconciliation {
    let mut skipped = Vec::new();
    let mut events = Vec::with_capacity(signals.len());

    for (index, row) in signals.iter().enumerate() {
        if row.ticker.trim() != ticker {
            continue;
        }
        match normalize(row) {
            Ok(event) => events.push(event),
            Err(reason) => {
                tracing::debug!(ticker, index, ?reason, "skipping signal row");
                skipped.push(SkippedSignal { index, reason });
            }
        }
    }

    // sort_by_key is stable: same-day rows keep their arrival order.
    events.sort_by_key(|e| e.date);

    let mut state = PositionState::Flat;
    let mut ledger = TradeLedger::default();
    let mut ignored = 0usize;

    for event in &events {
        let transition = match event.signal {
            Signal::Buy => state.on_buy(event.date, event.close),
            Signal::Sell => state.on_sell(ticker, event.date, event.close),
        };
        match transition {
            Transition::Opened => {}
            Transition::Closed(trade) => ledger.trades.push(trade),
            Transition::Ignored => ignored += 1,
        }
    }

    if !skipped.is_empty() {
        tracing::warn!(ticker, skipped = skipped.len(), "malformed signal rows skipped");
    }
    if !state.is_flat() {
        tracing::debug!(ticker, "position still open at end of history");
    }

    Reconciliation {
        ticker: ticker.to_string(),
        ledger,
        open_position: state.open_position(),
        skipped,
        ignored,
    }
}

fn normalize(row: &SignalRow) -> Result<Event, SkipReason> {
    let close = match row.close {
        Some(c) if c.is_finite() => c,
        _ => return Err(SkipReason::MissingClose),
    };
    let signal = row
        .label
        .parse::<Signal>()
        .map_err(|_| SkipReason::UnknownLabel(row.label.clone()))?;
    let date =
        parse_signal_date(&row.date).ok_or_else(|| SkipReason::InvalidDate(row.date.clone()))?;

    Ok(Event {
        date,
        signal,
        close,
    })
}

/// Accepts `YYYY-MM-DD` and timestamps with that date prefix.
pub fn parse_signal_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}
