//! CSV file price adapter.
//!
//! One file per ticker, `<base>/<TICKER>.csv`. Header names are matched
//! case-insensitively, so both `date,open,...` and yfinance-style
//! `Date,Open,...,Adj Close,...` exports load. Empty numeric cells become NaN
//! and are reported by series validation as missing values.

use crate::domain::error::{AlgologError, InputError};
use crate::domain::price::PriceBar;
use crate::domain::reconcile::parse_signal_date;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Positions of the required columns within a header row.
struct ColumnMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, InputError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| InputError::MissingColumn {
                    column: name.to_string(),
                })
        };

        let [date, open, high, low, close, volume] = COLUMNS;
        Ok(Self {
            date: find(date)?,
            open: find(open)?,
            high: find(high)?,
            low: find(low)?,
            close: find(close)?,
            volume: find(volume)?,
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn parse_number(
    record: &csv::StringRecord,
    index: usize,
    ticker: &str,
    field: &'static str,
    date: NaiveDate,
) -> Result<f64, InputError> {
    let raw = record.get(index).unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse().map_err(|e| InputError::InvalidField {
        ticker: ticker.to_string(),
        field,
        date,
        reason: format!("'{}': {}", raw, e),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AlgologError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| AlgologError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| AlgologError::DataSource {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let columns = ColumnMap::from_headers(headers)?;

        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| AlgologError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(columns.date).unwrap_or("").trim();
            let date = parse_signal_date(date_str).ok_or_else(|| InputError::InvalidDate {
                ticker: ticker.to_string(),
                value: date_str.to_string(),
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(PriceBar {
                ticker: ticker.to_string(),
                date,
                open: parse_number(&record, columns.open, ticker, "open", date)?,
                high: parse_number(&record, columns.high, ticker, "high", date)?,
                low: parse_number(&record, columns.low, ticker, "low", date)?,
                close: parse_number(&record, columns.close, ticker, "close", date)?,
                volume: parse_number(&record, columns.volume, ticker, "volume", date)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(ticker, bars = bars.len(), path = %path.display(), "loaded prices");
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, AlgologError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AlgologError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| AlgologError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tickers.push(stem.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
