//! Domain error types.

use chrono::NaiveDate;

/// Malformed price input. Raised by the indicator engine and the data adapters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("empty price series for {ticker}")]
    EmptySeries { ticker: String },

    #[error("{ticker}: missing {field} value on {date}")]
    MissingField {
        ticker: String,
        field: &'static str,
        date: NaiveDate,
    },

    #[error("{ticker}: invalid {field} value on {date}: {reason}")]
    InvalidField {
        ticker: String,
        field: &'static str,
        date: NaiveDate,
        reason: String,
    },

    #[error("{ticker}: invalid date '{value}'")]
    InvalidDate { ticker: String, value: String },

    #[error("{ticker}: bar dated {date} is not after the previous bar")]
    NotChronological { ticker: String, date: NaiveDate },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Top-level error type for algolog.
#[derive(Debug, thiserror::Error)]
pub enum AlgologError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("insufficient history for {ticker}: have {have} rows, need {need}")]
    InsufficientHistory {
        ticker: String,
        have: usize,
        need: usize,
    },

    #[error("inconsistent position state for {ticker}: {reason}")]
    StateInconsistency { ticker: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("ledger error: {reason}")]
    Ledger { reason: String },

    #[error("ledger query error: {reason}")]
    LedgerQuery { reason: String },

    #[error("classifier error: {reason}")]
    Classifier { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlgologError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        AlgologError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&AlgologError> for std::process::ExitCode {
    fn from(err: &AlgologError) -> Self {
        let code: u8 = match err {
            AlgologError::Io(_) => 1,
            AlgologError::ConfigParse { .. }
            | AlgologError::ConfigMissing { .. }
            | AlgologError::ConfigInvalid { .. } => 2,
            AlgologError::Ledger { .. } | AlgologError::LedgerQuery { .. } => 3,
            AlgologError::Input(_) => 4,
            AlgologError::DataSource { .. } | AlgologError::InsufficientHistory { .. } => 5,
            AlgologError::StateInconsistency { .. } | AlgologError::Classifier { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
