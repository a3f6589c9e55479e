//! Single-position state machine and closed trades.
//!
//! A ticker is either FLAT or LONG one open BUY. Transitions that would break
//! that invariant are ignored by `on_buy`/`on_sell` and rejected by `open`.

use crate::domain::error::AlgologError;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
}

impl OpenPosition {
    pub fn unrealized_profit(&self, price: f64) -> f64 {
        price - self.entry_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub profit: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long(OpenPosition),
}

/// What a signal did to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Opened,
    Closed(Trade),
    Ignored,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn open_position(&self) -> Option<OpenPosition> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(pos) => Some(*pos),
        }
    }

    /// FLAT --BUY--> LONG. A BUY while LONG is a no-op.
    pub fn on_buy(&mut self, date: NaiveDate, price: f64) -> Transition {
        match self {
            PositionState::Flat => {
                *self = PositionState::Long(OpenPosition {
                    entry_date: date,
                    entry_price: price,
                });
                Transition::Opened
            }
            PositionState::Long(_) => Transition::Ignored,
        }
    }

    /// LONG --SELL--> FLAT, emitting the closed trade. A SELL while FLAT is a no-op.
    pub fn on_sell(&mut self, ticker: &str, date: NaiveDate, price: f64) -> Transition {
        match *self {
            PositionState::Flat => Transition::Ignored,
            PositionState::Long(pos) => {
                *self = PositionState::Flat;
                Transition::Closed(Trade {
                    ticker: ticker.to_string(),
                    entry_date: pos.entry_date,
                    entry_price: pos.entry_price,
                    exit_date: date,
                    exit_price: price,
                    profit: price - pos.entry_price,
                })
            }
        }
    }

    /// Strict variant of `on_buy`: opening while LONG is an error.
    pub fn open(&mut self, ticker: &str, date: NaiveDate, price: f64) -> Result<(), AlgologError> {
        if let PositionState::Long(pos) = self {
            return Err(AlgologError::StateInconsistency {
                ticker: ticker.to_string(),
                reason: format!(
                    "BUY on {} while a position opened on {} is still open",
                    date, pos.entry_date
                ),
            });
        }
        self.on_buy(date, price);
        Ok(())
    }
}

/// Checks that trades form a single non-overlapping chain, which is what the
/// FLAT/LONG machine guarantees.
pub fn verify_ledger(ticker: &str, trades: &[Trade]) -> Result<(), AlgologError> {
    let mut prev_exit: Option<NaiveDate> = None;

    for trade in trades {
        if trade.ticker != ticker {
            return Err(AlgologError::StateInconsistency {
                ticker: ticker.to_string(),
                reason: format!("trade for {} found in ledger", trade.ticker),
            });
        }
        if trade.exit_date < trade.entry_date {
            return Err(AlgologError::StateInconsistency {
                ticker: ticker.to_string(),
                reason: format!(
                    "trade exits on {} before its entry on {}",
                    trade.exit_date, trade.entry_date
                ),
            });
        }
        if let Some(exit) = prev_exit {
            if trade.entry_date < exit {
                return Err(AlgologError::StateInconsistency {
                    ticker: ticker.to_string(),
                    reason: format!(
                        "trade opened on {} overlaps a trade closed on {}",
                        trade.entry_date, exit
                    ),
                });
            }
        }
        prev_exit = Some(trade.exit_date);
    }

    Ok(())
}
