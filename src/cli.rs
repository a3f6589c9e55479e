//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::decision_tree::{DecisionTreeClassifier, TreeConfig};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::retry::RetryingDataPort;
use crate::domain::config_validation::{build_settings, parse_tickers, Settings};
use crate::domain::error::AlgologError;
use crate::domain::pipeline::{Pipeline, RunReport};
use crate::domain::reconcile::SummaryRow;
use crate::ports::data_port::DataPort;
use crate::ports::ledger_port::LedgerPort;

#[derive(Parser, Debug)]
#[command(name = "algolog", about = "RSI/MACD signal logger and P&L reconciler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute signals, store them and reconcile P&L
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Process a single ticker instead of the configured universe
        #[arg(long)]
        ticker: Option<String>,
        /// Compute and report without writing to the ledger
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the stored P&L summaries
    Summary {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List tickers with price files in the data directory
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            ticker,
            dry_run,
        } => run_signals(&config, ticker.as_deref(), dry_run),
        Command::Summary { config } => run_summary(&config),
        Command::Validate { config } => run_validate(&config),
        Command::ListTickers { config } => run_list_tickers(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = AlgologError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_settings(path: &PathBuf) -> Result<Settings, ExitCode> {
    let adapter = load_config(path)?;
    match build_settings(&adapter) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            eprintln!("error: {e}");
            Err((&e).into())
        }
    }
}

/// A `--ticker` override replaces the configured list.
pub fn resolve_tickers(
    ticker_override: Option<&str>,
    settings: &Settings,
) -> Result<Vec<String>, AlgologError> {
    match ticker_override {
        Some(t) => parse_tickers(t)
            .map_err(|e| AlgologError::config_invalid("universe", "tickers", e.to_string())),
        None => Ok(settings.tickers.clone()),
    }
}

pub fn data_port(settings: &Settings) -> RetryingDataPort<CsvAdapter> {
    RetryingDataPort::new(
        CsvAdapter::new(settings.data_path.clone()),
        settings.retries,
        settings.retry_delay,
    )
}

/// Runs every ticker through the pipeline. With no ledger this is a dry run.
pub fn run_pipeline(
    settings: &Settings,
    tickers: &[String],
    ledger: Option<&dyn LedgerPort>,
    run_date: NaiveDate,
) -> RunReport {
    let data = data_port(settings);
    let mut tree = DecisionTreeClassifier::new(TreeConfig::from(&settings.classifier));

    let mut pipeline = Pipeline::new(&data, settings, run_date);
    if let Some(ledger) = ledger {
        pipeline = pipeline.with_ledger(ledger);
    }
    if settings.classifier.enabled {
        pipeline = pipeline.with_classifier(&mut tree);
    }

    pipeline.run_all(tickers)
}

fn run_signals(config_path: &PathBuf, ticker: Option<&str>, dry_run: bool) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let tickers = match resolve_tickers(ticker, &settings) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let run_date = Local::now().date_naive();
    eprintln!(
        "Processing {} tickers, {} to {}",
        tickers.len(),
        settings.start_date,
        settings.end_date
    );

    if dry_run {
        eprintln!("Dry run: nothing will be written");
        let report = run_pipeline(&settings, &tickers, None, run_date);
        return finish(&report);
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteLedger;

        let ledger = match SqliteLedger::from_settings(&settings) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let report = run_pipeline(&settings, &tickers, Some(&ledger), run_date);
        finish(&report)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = run_date;
        eprintln!("error: sqlite feature is required to write the ledger (use --dry-run)");
        ExitCode::from(1)
    }
}

fn finish(report: &RunReport) -> ExitCode {
    print_report(report);

    match report.failures.first() {
        Some((_, e)) if report.reports.is_empty() => e.into(),
        _ => ExitCode::SUCCESS,
    }
}

fn print_report(report: &RunReport) {
    eprintln!("\n=== Per-Ticker Results ===");
    for r in &report.reports {
        let accuracy = r
            .evaluation
            .as_ref()
            .map(|e| format!("{:.2}%", e.accuracy * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        eprintln!(
            "  {}:  {} bars, {} BUY / {} SELL, {} trades, {:.1}% win rate, profit {:.2}, model {}",
            r.ticker,
            r.bars,
            r.buys,
            r.sells,
            r.summary.total_trades,
            r.summary.win_ratio * 100.0,
            r.summary.total_profit,
            accuracy,
        );
        if let Some(days) = r.reconciliation.ledger.average_holding_days() {
            eprintln!("      average holding period {:.1} days", days);
        }
        if let Some(open) = r.reconciliation.open_position {
            let mark = r
                .summary
                .unrealized_profit
                .map(|p| format!(", unrealized {:.2}", p))
                .unwrap_or_default();
            eprintln!(
                "      open since {} at {:.2}{}",
                open.entry_date, open.entry_price, mark
            );
        }
        if !r.reconciliation.skipped.is_empty() {
            eprintln!(
                "      {} malformed signal rows skipped",
                r.reconciliation.skipped.len()
            );
        }
    }

    if !report.failures.is_empty() {
        eprintln!("\n=== Failures ===");
        for (ticker, e) in &report.failures {
            eprintln!("  {}: {}", ticker, e);
        }
    }
}

pub fn format_summary(row: &SummaryRow) -> String {
    let mut line = format!(
        "{:<14} trades {:>4}  wins {:>4}  win {:>6.2}%  model {:>6.2}%  profit {:>10.2}",
        row.ticker,
        row.total_trades,
        row.winning_trades,
        row.win_ratio_percent,
        row.model_accuracy_percent,
        row.total_profit
    );
    if let Some(p) = row.unrealized_profit {
        line.push_str(&format!("  unrealized {:>10.2}", p));
    }
    line
}

fn run_summary(config_path: &PathBuf) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteLedger;

        let ledger = match SqliteLedger::from_settings(&settings) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let rows = match ledger.summaries() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        if rows.is_empty() {
            eprintln!("No summaries stored yet");
        }
        for row in &rows {
            println!("{}", format_summary(row));
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = settings;
        eprintln!("error: sqlite feature is required for summary");
        ExitCode::from(1)
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    eprintln!("\nUniverse:");
    eprintln!("  tickers: {}", settings.tickers.join(", "));
    eprintln!("  range:   {} to {}", settings.start_date, settings.end_date);
    eprintln!("\nIndicators: {}", settings.indicators);
    eprintln!(
        "Signals:    BUY below {}, SELL above {}",
        settings.thresholds.buy_below, settings.thresholds.sell_above
    );
    eprintln!(
        "Classifier: {}",
        if settings.classifier.enabled {
            settings.classifier.model.as_str()
        } else {
            "disabled"
        }
    );

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}

fn run_list_tickers(config_path: &PathBuf) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let tickers = match data_port(&settings).list_tickers() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if tickers.is_empty() {
        eprintln!("No price files found in {}", settings.data_path.display());
    } else {
        for ticker in &tickers {
            println!("{}", ticker);
        }
        eprintln!("{} tickers found", tickers.len());
    }
    ExitCode::SUCCESS
}
