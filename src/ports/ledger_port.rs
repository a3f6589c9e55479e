//! Persistence sink port trait.
//!
//! Every write is an idempotent upsert so a rerun over the same data leaves
//! the store unchanged:
//! - signals are keyed by (ticker, date); an exact duplicate row is skipped,
//!   a changed row replaces the stored one in place
//! - P&L summaries are keyed by ticker
//! - model accuracy is keyed by (model, date)

use crate::domain::classifier::PredictionRow;
use crate::domain::error::AlgologError;
use crate::domain::reconcile::SummaryRow;
use crate::domain::signal::SignalRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelAccuracyRow {
    pub model: String,
    pub accuracy_percent: f64,
    pub date: String,
}

pub trait LedgerPort {
    fn upsert_signals(&self, rows: &[SignalRow]) -> Result<UpsertOutcome, AlgologError>;

    /// Every stored signal for `ticker`, in arrival order.
    fn signal_history(&self, ticker: &str) -> Result<Vec<SignalRow>, AlgologError>;

    fn upsert_summary(&self, row: &SummaryRow) -> Result<(), AlgologError>;

    fn summaries(&self) -> Result<Vec<SummaryRow>, AlgologError>;

    fn upsert_model_accuracy(&self, row: &ModelAccuracyRow) -> Result<(), AlgologError>;

    fn append_predictions(&self, rows: &[PredictionRow]) -> Result<(), AlgologError>;
}
