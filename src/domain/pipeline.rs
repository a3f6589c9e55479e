//! Per-ticker run: prices → indicators → signals → sink → classifier →
//! reconciliation → summary.
//!
//! Tickers are independent. `run_all` logs a failing ticker and moves on.

use crate::domain::classifier::{evaluate, Evaluation};
use crate::domain::config_validation::Settings;
use crate::domain::error::AlgologError;
use crate::domain::indicator;
use crate::domain::position::verify_ledger;
use crate::domain::price::last_close;
use crate::domain::reconcile::{reconcile, OpenPositionPolicy, PlSummary, Reconciliation};
use crate::domain::signal::{label, round_to, SignalSeries};
use crate::ports::classifier_port::ClassifierPort;
use crate::ports::data_port::DataPort;
use crate::ports::ledger_port::{LedgerPort, ModelAccuracyRow, UpsertOutcome};
use chrono::NaiveDate;

#[derive(Debug)]
pub struct TickerReport {
    pub ticker: String,
    pub bars: usize,
    pub indicator_rows: usize,
    pub buys: usize,
    pub sells: usize,
    pub upsert: UpsertOutcome,
    pub evaluation: Option<Evaluation>,
    pub reconciliation: Reconciliation,
    pub summary: PlSummary,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub reports: Vec<TickerReport>,
    pub failures: Vec<(String, AlgologError)>,
}

pub struct Pipeline<'a> {
    data: &'a dyn DataPort,
    settings: &'a Settings,
    run_date: NaiveDate,
    ledger: Option<&'a dyn LedgerPort>,
    classifier: Option<&'a mut dyn ClassifierPort>,
}

impl<'a> Pipeline<'a> {
    pub fn new(data: &'a dyn DataPort, settings: &'a Settings, run_date: NaiveDate) -> Self {
        Self {
            data,
            settings,
            run_date,
            ledger: None,
            classifier: None,
        }
    }

    /// Without a ledger nothing is persisted and reconciliation only sees
    /// the signals generated in this run.
    pub fn with_ledger(mut self, ledger: &'a dyn LedgerPort) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_classifier(mut self, classifier: &'a mut dyn ClassifierPort) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn run_ticker(&mut self, ticker: &str) -> Result<TickerReport, AlgologError> {
        let settings = self.settings;

        let bars = self
            .data
            .fetch_prices(ticker, settings.start_date, settings.end_date)?;

        let warmup = settings.indicators.warmup();
        if bars.len() < warmup {
            tracing::warn!(
                ticker,
                bars = bars.len(),
                warmup,
                "not enough history for {}; no indicators will be produced",
                settings.indicators
            );
        }

        let series = indicator::compute(ticker, &bars, &settings.indicators)?;
        let signals = label(&series, &settings.thresholds);
        let (buys, sells) = signals.counts();

        let upsert = match self.ledger {
            Some(ledger) => {
                let outcome = ledger.upsert_signals(&signals.rows())?;
                tracing::info!(
                    ticker,
                    inserted = outcome.inserted,
                    updated = outcome.updated,
                    duplicates = outcome.duplicates,
                    "stored signals"
                );
                outcome
            }
            None => UpsertOutcome::default(),
        };

        let evaluation = self.evaluate_classifier(&signals)?;
        let model_accuracy = evaluation.as_ref().map(|e| e.accuracy).unwrap_or(0.0);

        let history = match self.ledger {
            Some(ledger) => ledger.signal_history(ticker)?,
            None => signals.rows(),
        };
        let reconciliation = reconcile(ticker, &history);
        verify_ledger(ticker, &reconciliation.ledger.trades)?;

        let policy = match (settings.mark_to_market, last_close(&bars)) {
            (true, Some(price)) => OpenPositionPolicy::MarkToMarket { price },
            _ => OpenPositionPolicy::Exclude,
        };
        let summary = reconciliation.summary(model_accuracy, policy);

        if let Some(ledger) = self.ledger {
            ledger.upsert_summary(&summary.to_row())?;
        }

        tracing::info!(
            ticker,
            trades = summary.total_trades,
            wins = summary.winning_trades,
            profit = summary.total_profit,
            "reconciled"
        );

        Ok(TickerReport {
            ticker: ticker.to_string(),
            bars: bars.len(),
            indicator_rows: series.len(),
            buys,
            sells,
            upsert,
            evaluation,
            reconciliation,
            summary,
        })
    }

    /// Classifier failures are logged and reported as `None`; only sink
    /// errors propagate.
    fn evaluate_classifier(
        &mut self,
        signals: &SignalSeries,
    ) -> Result<Option<Evaluation>, AlgologError> {
        let Some(classifier) = self.classifier.as_deref_mut() else {
            return Ok(None);
        };

        let evaluation = match evaluate(classifier, signals) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(ticker = %signals.ticker, error = %e, "skipping classifier");
                return Ok(None);
            }
        };

        if let Some(ledger) = self.ledger {
            ledger.upsert_model_accuracy(&ModelAccuracyRow {
                model: evaluation.model.clone(),
                accuracy_percent: round_to(evaluation.accuracy * 100.0, 2),
                date: self.run_date.format("%Y-%m-%d").to_string(),
            })?;
            let rows: Vec<_> = evaluation.predictions.iter().map(|p| p.to_row()).collect();
            ledger.append_predictions(&rows)?;
        }

        Ok(Some(evaluation))
    }

    pub fn run_all(&mut self, tickers: &[String]) -> RunReport {
        let mut report = RunReport::default();

        for ticker in tickers {
            let span = tracing::info_span!("ticker", %ticker);
            let _guard = span.enter();

            match self.run_ticker(ticker) {
                Ok(r) => report.reports.push(r),
                Err(e) => {
                    tracing::error!(error = %e, "ticker failed");
                    report.failures.push((ticker.clone(), e));
                }
            }
        }

        report
    }
}
