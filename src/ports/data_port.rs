//! Price data supply port trait.

use crate::domain::error::AlgologError;
use crate::domain::price::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `ticker` within `[start_date, end_date]`, ascending by date.
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AlgologError>;

    fn list_tickers(&self) -> Result<Vec<String>, AlgologError>;
}
