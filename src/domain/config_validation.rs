//! Configuration validation and typed settings.
//!
//! `validate_config` checks every section before a run; `build_settings`
//! validates and then reads the values into [`Settings`].

use crate::domain::classifier::DEFAULT_MODEL;
use crate::domain::error::AlgologError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::signal::SignalThresholds;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATA_PATH: &str = "data";
pub const DEFAULT_RETRIES: i64 = 3;
pub const DEFAULT_RETRY_DELAY_MS: i64 = 2000;
pub const DEFAULT_POOL_SIZE: i64 = 4;

const RETRIES: RangeInclusive<i64> = 1..=100;
const RETRY_DELAY_MS: RangeInclusive<i64> = 0..=600_000;
const MAX_DEPTH: RangeInclusive<i64> = 1..=1_000;
const MIN_SAMPLES_SPLIT: RangeInclusive<i64> = 2..=1_000_000;
const MIN_SAMPLES_LEAF: RangeInclusive<i64> = 1..=1_000_000;
const POOL_SIZE: RangeInclusive<i64> = 1..=64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickerListError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Splits a comma-separated ticker list. Tickers are trimmed and upper-cased.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, TickerListError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(TickerListError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(TickerListError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub enabled: bool,
    pub model: String,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_path: PathBuf,
    pub retries: u32,
    pub retry_delay: Duration,
    pub indicators: IndicatorParams,
    pub thresholds: SignalThresholds,
    pub mark_to_market: bool,
    pub classifier: ClassifierSettings,
    pub ledger_path: Option<String>,
    pub ledger_pool_size: u32,
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), AlgologError> {
    validate_tickers(config)?;
    validate_dates(config)?;
    validate_data(config)?;
    validate_indicators(config)?;
    validate_thresholds(config)?;
    validate_classifier(config)?;
    validate_ledger(config)?;
    Ok(())
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<Settings, AlgologError> {
    validate_config(config)?;

    let tickers = validate_tickers(config)?;
    let (start_date, end_date) = validate_dates(config)?;
    let (retries, retry_delay) = validate_data(config)?;
    let (ledger_path, ledger_pool_size) = validate_ledger(config)?;

    Ok(Settings {
        tickers,
        start_date,
        end_date,
        data_path: PathBuf::from(
            config
                .get_string("data", "path")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()),
        ),
        retries,
        retry_delay,
        indicators: indicator_params(config),
        thresholds: thresholds(config),
        mark_to_market: config.get_bool("reconcile", "mark_to_market", false),
        classifier: validate_classifier(config)?,
        ledger_path,
        ledger_pool_size,
    })
}

/// Reads an integer key, rejecting values outside `range`.
fn bounded(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, AlgologError> {
    let value = config.get_int(section, key, default);
    if !range.contains(&value) {
        return Err(AlgologError::config_invalid(
            section,
            key,
            format!(
                "{} must be between {} and {}, got {}",
                key,
                range.start(),
                range.end(),
                value
            ),
        ));
    }
    Ok(value)
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<Vec<String>, AlgologError> {
    match config.get_string("universe", "tickers") {
        Some(s) if !s.trim().is_empty() => parse_tickers(&s)
            .map_err(|e| AlgologError::config_invalid("universe", "tickers", e.to_string())),
        _ => Err(AlgologError::ConfigMissing {
            section: "universe".to_string(),
            key: "tickers".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), AlgologError> {
    let start_str = config.get_string("universe", "start_date");
    let end_str = config.get_string("universe", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(AlgologError::config_invalid(
            "universe",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok((start_date, end_date))
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, AlgologError> {
    match value {
        None => Err(AlgologError::ConfigMissing {
            section: "universe".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            AlgologError::config_invalid(
                "universe",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(u32, Duration), AlgologError> {
    let retries = bounded(config, "data", "retries", DEFAULT_RETRIES, RETRIES)?;
    let delay_ms = bounded(
        config,
        "data",
        "retry_delay_ms",
        DEFAULT_RETRY_DELAY_MS,
        RETRY_DELAY_MS,
    )?;
    Ok((retries as u32, Duration::from_millis(delay_ms as u64)))
}

fn period(config: &dyn ConfigPort, key: &'static str, default: usize) -> Result<usize, AlgologError> {
    let value = config.get_int("indicators", key, default as i64);
    if value < 1 {
        return Err(AlgologError::config_invalid(
            "indicators",
            key,
            format!("{} must be at least 1", key),
        ));
    }
    Ok(value as usize)
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), AlgologError> {
    let defaults = IndicatorParams::default();
    period(config, "rsi_period", defaults.rsi_period)?;
    let ma_short = period(config, "ma_short", defaults.ma_short)?;
    let ma_long = period(config, "ma_long", defaults.ma_long)?;
    let macd_fast = period(config, "macd_fast", defaults.macd_fast)?;
    let macd_slow = period(config, "macd_slow", defaults.macd_slow)?;

    if ma_short > ma_long {
        return Err(AlgologError::config_invalid(
            "indicators",
            "ma_short",
            "ma_short must not exceed ma_long",
        ));
    }
    if macd_fast >= macd_slow {
        return Err(AlgologError::config_invalid(
            "indicators",
            "macd_fast",
            "macd_fast must be less than macd_slow",
        ));
    }
    Ok(())
}

fn indicator_params(config: &dyn ConfigPort) -> IndicatorParams {
    let defaults = IndicatorParams::default();
    let get = |key: &str, default: usize| config.get_int("indicators", key, default as i64) as usize;
    IndicatorParams {
        rsi_period: get("rsi_period", defaults.rsi_period),
        ma_short: get("ma_short", defaults.ma_short),
        ma_long: get("ma_long", defaults.ma_long),
        macd_fast: get("macd_fast", defaults.macd_fast),
        macd_slow: get("macd_slow", defaults.macd_slow),
    }
}

fn thresholds(config: &dyn ConfigPort) -> SignalThresholds {
    let defaults = SignalThresholds::default();
    SignalThresholds {
        buy_below: config.get_double("signals", "buy_below", defaults.buy_below),
        sell_above: config.get_double("signals", "sell_above", defaults.sell_above),
    }
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), AlgologError> {
    let t = thresholds(config);
    if !(0.0..=100.0).contains(&t.buy_below) {
        return Err(AlgologError::config_invalid(
            "signals",
            "buy_below",
            "buy_below must be between 0 and 100",
        ));
    }
    if !(0.0..=100.0).contains(&t.sell_above) {
        return Err(AlgologError::config_invalid(
            "signals",
            "sell_above",
            "sell_above must be between 0 and 100",
        ));
    }
    if t.buy_below >= t.sell_above {
        return Err(AlgologError::config_invalid(
            "signals",
            "buy_below",
            "buy_below must be less than sell_above",
        ));
    }
    Ok(())
}

fn validate_classifier(config: &dyn ConfigPort) -> Result<ClassifierSettings, AlgologError> {
    if let Some(model) = config.get_string("classifier", "model") {
        if model.trim() != DEFAULT_MODEL {
            return Err(AlgologError::config_invalid(
                "classifier",
                "model",
                format!("unsupported model '{}', expected {}", model.trim(), DEFAULT_MODEL),
            ));
        }
    }

    let defaults = ClassifierSettings::default();
    let max_depth = bounded(
        config,
        "classifier",
        "max_depth",
        defaults.max_depth as i64,
        MAX_DEPTH,
    )?;
    let min_samples_split = bounded(
        config,
        "classifier",
        "min_samples_split",
        defaults.min_samples_split as i64,
        MIN_SAMPLES_SPLIT,
    )?;
    let min_samples_leaf = bounded(
        config,
        "classifier",
        "min_samples_leaf",
        defaults.min_samples_leaf as i64,
        MIN_SAMPLES_LEAF,
    )?;

    Ok(ClassifierSettings {
        enabled: config.get_bool("classifier", "enabled", defaults.enabled),
        model: defaults.model,
        max_depth: max_depth as usize,
        min_samples_split: min_samples_split as usize,
        min_samples_leaf: min_samples_leaf as usize,
    })
}

fn validate_ledger(config: &dyn ConfigPort) -> Result<(Option<String>, u32), AlgologError> {
    let pool_size = bounded(config, "ledger", "pool_size", DEFAULT_POOL_SIZE, POOL_SIZE)?;
    let path = config
        .get_string("ledger", "path")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    Ok((path, pool_size as u32))
}
