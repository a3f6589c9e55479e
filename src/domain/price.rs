//! Daily price bars and series validation.

use crate::domain::error::InputError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
    }
}

/// Checks the shape the indicator engine relies on: non-empty, every numeric
/// field present, volume non-negative, dates strictly ascending.
pub fn validate_series(ticker: &str, bars: &[PriceBar]) -> Result<(), InputError> {
    if bars.is_empty() {
        return Err(InputError::EmptySeries {
            ticker: ticker.to_string(),
        });
    }

    let mut prev: Option<NaiveDate> = None;
    for bar in bars {
        for (field, value) in bar.fields() {
            if !value.is_finite() {
                return Err(InputError::MissingField {
                    ticker: ticker.to_string(),
                    field,
                    date: bar.date,
                });
            }
        }

        if bar.volume < 0.0 {
            return Err(InputError::InvalidField {
                ticker: ticker.to_string(),
                field: "volume",
                date: bar.date,
                reason: format!("volume must be non-negative, got {}", bar.volume),
            });
        }

        if let Some(prev_date) = prev {
            if bar.date <= prev_date {
                return Err(InputError::NotChronological {
                    ticker: ticker.to_string(),
                    date: bar.date,
                });
            }
        }
        prev = Some(bar.date);
    }

    Ok(())
}

/// Close of the most recent bar, used as the mark price for open positions.
pub fn last_close(bars: &[PriceBar]) -> Option<f64> {
    bars.last().map(|b| b.close)
}
