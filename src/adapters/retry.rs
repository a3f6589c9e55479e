//! Bounded-retry decorator for any `DataPort`.

use crate::domain::error::AlgologError;
use crate::domain::price::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::thread;
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Retries failed fetches a fixed number of times with a fixed pause between
/// attempts. Malformed input is returned at once since a retry cannot fix it.
pub struct RetryingDataPort<P: DataPort> {
    inner: P,
    attempts: u32,
    delay: Duration,
}

impl<P: DataPort> RetryingDataPort<P> {
    pub fn new(inner: P, attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            delay,
        }
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &P {
        &self.inner
    }

    fn retry<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, AlgologError>,
    ) -> Result<T, AlgologError> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err @ AlgologError::Input(_)) => return Err(err),
                Err(err) if attempt >= self.attempts => {
                    tracing::error!(what, attempts = self.attempts, error = %err, "giving up");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        what,
                        attempt,
                        attempts = self.attempts,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl<P: DataPort> DataPort for RetryingDataPort<P> {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AlgologError> {
        self.retry(ticker, || {
            self.inner.fetch_prices(ticker, start_date, end_date)
        })
    }

    fn list_tickers(&self) -> Result<Vec<String>, AlgologError> {
        self.retry("list_tickers", || self.inner.list_tickers())
    }
}
