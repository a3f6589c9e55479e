#![allow(dead_code)]

use algolog::domain::classifier::PredictionRow;
use algolog::domain::config_validation::{ClassifierSettings, Settings};
use algolog::domain::error::AlgologError;
use algolog::domain::indicator::IndicatorParams;
pub use algolog::domain::price::PriceBar;
use algolog::domain::reconcile::SummaryRow;
use algolog::domain::signal::{SignalRow, SignalThresholds};
use algolog::ports::data_port::DataPort;
use algolog::ports::ledger_port::{LedgerPort, ModelAccuracyRow, UpsertOutcome};
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AlgologError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(AlgologError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, AlgologError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// In-memory `LedgerPort` with the same upsert keys as the SQLite ledger.
#[derive(Default)]
pub struct MemoryLedger {
    pub signals: RefCell<Vec<SignalRow>>,
    pub summaries: RefCell<BTreeMap<String, SummaryRow>>,
    pub accuracy: RefCell<BTreeMap<(String, String), f64>>,
    pub predictions: RefCell<Vec<PredictionRow>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signals(self, rows: Vec<SignalRow>) -> Self {
        self.signals.borrow_mut().extend(rows);
        self
    }
}

impl LedgerPort for MemoryLedger {
    fn upsert_signals(&self, rows: &[SignalRow]) -> Result<UpsertOutcome, AlgologError> {
        let mut stored = self.signals.borrow_mut();
        let mut outcome = UpsertOutcome::default();

        for row in rows {
            match stored
                .iter_mut()
                .find(|s| s.ticker == row.ticker && s.date == row.date)
            {
                Some(existing) if *existing == *row => outcome.duplicates += 1,
                Some(existing) => {
                    *existing = row.clone();
                    outcome.updated += 1;
                }
                None => {
                    stored.push(row.clone());
                    outcome.inserted += 1;
                }
            }
        }

        Ok(outcome)
    }

    fn signal_history(&self, ticker: &str) -> Result<Vec<SignalRow>, AlgologError> {
        Ok(self
            .signals
            .borrow()
            .iter()
            .filter(|s| s.ticker == ticker)
            .cloned()
            .collect())
    }

    fn upsert_summary(&self, row: &SummaryRow) -> Result<(), AlgologError> {
        self.summaries
            .borrow_mut()
            .insert(row.ticker.clone(), row.clone());
        Ok(())
    }

    fn summaries(&self) -> Result<Vec<SummaryRow>, AlgologError> {
        Ok(self.summaries.borrow().values().cloned().collect())
    }

    fn upsert_model_accuracy(&self, row: &ModelAccuracyRow) -> Result<(), AlgologError> {
        self.accuracy
            .borrow_mut()
            .insert((row.model.clone(), row.date.clone()), row.accuracy_percent);
        Ok(())
    }

    fn append_predictions(&self, rows: &[PredictionRow]) -> Result<(), AlgologError> {
        self.predictions.borrow_mut().extend_from_slice(rows);
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(ticker: &str, date: &str, close: f64) -> PriceBar {
    PriceBar {
        ticker: ticker.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// One bar per day starting at `start_date`, with the given closes.
pub fn bars_from_closes(ticker: &str, start_date: &str, closes: &[f64]) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            ticker: ticker.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0 + i as f64,
        })
        .collect()
}

pub fn generate_bars(ticker: &str, start_date: &str, count: usize, start_price: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(ticker, start_date, &closes)
}

/// Alternating down and up swings. Every 3-bar window inside a down swing
/// holds two -5 moves and one +1, inside an up swing two +5 moves and one -1,
/// so a 3-period RSI reads about 9 (BUY) and about 91 (SELL) respectively.
pub fn swing_closes(cycles: usize) -> Vec<f64> {
    let down = [-5.0, -5.0, 1.0, -5.0, -5.0, 1.0];
    let up = [5.0, 5.0, -1.0, 5.0, 5.0, -1.0];

    let mut closes = vec![100.0];
    for _ in 0..cycles {
        for delta in down.iter().chain(up.iter()) {
            let last = closes[closes.len() - 1];
            closes.push(last + delta);
        }
    }
    closes
}

pub fn signal_row(ticker: &str, date: &str, close: Option<f64>, label: &str) -> SignalRow {
    SignalRow {
        ticker: ticker.to_string(),
        date: date.to_string(),
        close,
        rsi: None,
        ma_short: None,
        ma_long: None,
        macd: None,
        volume: None,
        label: label.to_string(),
    }
}

/// Short windows so small hand-built series produce output.
pub fn test_settings(tickers: &[&str]) -> Settings {
    Settings {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        data_path: PathBuf::from("data"),
        retries: 1,
        retry_delay: Duration::ZERO,
        indicators: IndicatorParams {
            rsi_period: 3,
            ma_short: 2,
            ma_long: 4,
            macd_fast: 2,
            macd_slow: 4,
        },
        thresholds: SignalThresholds::default(),
        mark_to_market: false,
        classifier: ClassifierSettings::default(),
        ledger_path: None,
        ledger_pool_size: 1,
    }
}
