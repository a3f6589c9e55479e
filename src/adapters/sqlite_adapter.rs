//! SQLite ledger adapter.
//!
//! Tables:
//! - `signals`: one row per (ticker, date), `seq` records arrival order
//! - `pl_summary`: one row per ticker
//! - `model_accuracy`: one row per (model, date)
//! - `ml_predictions`: append-only

use crate::domain::classifier::PredictionRow;
use crate::domain::config_validation::Settings;
use crate::domain::error::AlgologError;
use crate::domain::reconcile::SummaryRow;
use crate::domain::signal::SignalRow;
use crate::ports::ledger_port::{LedgerPort, ModelAccuracyRow, UpsertOutcome};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension};

pub struct SqliteLedger {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> AlgologError {
    AlgologError::Ledger {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> AlgologError {
    AlgologError::LedgerQuery {
        reason: e.to_string(),
    }
}

/// Reads a numeric column leniently: REAL and INTEGER as-is, TEXT when it
/// parses, anything else as missing.
fn lenient_f64(value: Value) -> Option<f64> {
    match value {
        Value::Real(v) => Some(v),
        Value::Integer(v) => Some(v as f64),
        Value::Text(s) => s.trim().parse().ok(),
        Value::Null | Value::Blob(_) => None,
    }
}

fn lenient_text(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Null | Value::Blob(_) => String::new(),
    }
}

impl SqliteLedger {
    /// Opens the ledger named by `[ledger] path`.
    pub fn from_settings(settings: &Settings) -> Result<Self, AlgologError> {
        let db_path = settings
            .ledger_path
            .as_deref()
            .ok_or_else(|| AlgologError::ConfigMissing {
                section: "ledger".into(),
                key: "path".into(),
            })?;
        Self::open(db_path, settings.ledger_pool_size)
    }

    pub fn open(db_path: &str, pool_size: u32) -> Result<Self, AlgologError> {
        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(pool_err)?;

        let ledger = Self { pool };
        ledger.initialize_schema()?;
        tracing::debug!(path = %db_path, pool_size, "opened ledger");
        Ok(ledger)
    }

    pub fn in_memory() -> Result<Self, AlgologError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let ledger = Self { pool };
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AlgologError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), AlgologError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS signals (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                close REAL,
                rsi REAL,
                ma_short REAL,
                ma_long REAL,
                macd REAL,
                volume REAL,
                label TEXT NOT NULL,
                UNIQUE (ticker, date)
            );
            CREATE INDEX IF NOT EXISTS idx_signals_ticker ON signals(ticker);
            CREATE TABLE IF NOT EXISTS pl_summary (
                ticker TEXT PRIMARY KEY,
                total_trades INTEGER NOT NULL,
                winning_trades INTEGER NOT NULL,
                win_ratio REAL NOT NULL,
                model_accuracy REAL NOT NULL,
                total_profit REAL NOT NULL,
                unrealized_profit REAL
            );
            CREATE TABLE IF NOT EXISTS model_accuracy (
                model TEXT NOT NULL,
                date TEXT NOT NULL,
                accuracy REAL NOT NULL,
                PRIMARY KEY (model, date)
            );
            CREATE TABLE IF NOT EXISTS ml_predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                ticker TEXT NOT NULL,
                rsi REAL NOT NULL,
                macd REAL NOT NULL,
                volume REAL NOT NULL,
                predicted TEXT NOT NULL,
                actual TEXT NOT NULL,
                correct INTEGER NOT NULL
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }

    pub fn model_accuracy(&self, model: &str) -> Result<Vec<ModelAccuracyRow>, AlgologError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT model, accuracy, date FROM model_accuracy WHERE model = ?1 ORDER BY date")
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![model], |row| {
                Ok(ModelAccuracyRow {
                    model: row.get(0)?,
                    accuracy_percent: row.get(1)?,
                    date: row.get(2)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    pub fn prediction_count(&self, ticker: &str) -> Result<usize, AlgologError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM ml_predictions WHERE ticker = ?1",
                params![ticker],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(count as usize)
    }
}

type StoredSignal = (
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    String,
);

impl LedgerPort for SqliteLedger {
    fn upsert_signals(&self, rows: &[SignalRow]) -> Result<UpsertOutcome, AlgologError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let mut outcome = UpsertOutcome::default();

        for row in rows {
            let existing: Option<StoredSignal> = tx
                .query_row(
                    "SELECT close, rsi, ma_short, ma_long, macd, volume, label
                     FROM signals WHERE ticker = ?1 AND date = ?2",
                    params![row.ticker, row.date],
                    |r| {
                        Ok((
                            lenient_f64(r.get(0)?),
                            lenient_f64(r.get(1)?),
                            lenient_f64(r.get(2)?),
                            lenient_f64(r.get(3)?),
                            lenient_f64(r.get(4)?),
                            lenient_f64(r.get(5)?),
                            lenient_text(r.get(6)?),
                        ))
                    },
                )
                .optional()
                .map_err(query_err)?;

            let incoming: StoredSignal = (
                row.close,
                row.rsi,
                row.ma_short,
                row.ma_long,
                row.macd,
                row.volume,
                row.label.clone(),
            );

            match existing {
                None => {
                    tx.execute(
                        "INSERT INTO signals (ticker, date, close, rsi, ma_short, ma_long, macd, volume, label)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            row.ticker,
                            row.date,
                            row.close,
                            row.rsi,
                            row.ma_short,
                            row.ma_long,
                            row.macd,
                            row.volume,
                            row.label
                        ],
                    )
                    .map_err(query_err)?;
                    outcome.inserted += 1;
                }
                Some(stored) if stored == incoming => outcome.duplicates += 1,
                Some(_) => {
                    // Updating in place keeps the original arrival seq.
                    tx.execute(
                        "UPDATE signals SET close = ?3, rsi = ?4, ma_short = ?5, ma_long = ?6,
                                macd = ?7, volume = ?8, label = ?9
                         WHERE ticker = ?1 AND date = ?2",
                        params![
                            row.ticker,
                            row.date,
                            row.close,
                            row.rsi,
                            row.ma_short,
                            row.ma_long,
                            row.macd,
                            row.volume,
                            row.label
                        ],
                    )
                    .map_err(query_err)?;
                    outcome.updated += 1;
                }
            }
        }

        tx.commit().map_err(query_err)?;
        Ok(outcome)
    }

    fn signal_history(&self, ticker: &str) -> Result<Vec<SignalRow>, AlgologError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT ticker, date, close, rsi, ma_short, ma_long, macd, volume, label
                 FROM signals WHERE ticker = ?1 ORDER BY seq ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![ticker], |row| {
                Ok(SignalRow {
                    ticker: row.get(0)?,
                    date: lenient_text(row.get(1)?),
                    close: lenient_f64(row.get(2)?),
                    rsi: lenient_f64(row.get(3)?),
                    ma_short: lenient_f64(row.get(4)?),
                    ma_long: lenient_f64(row.get(5)?),
                    macd: lenient_f64(row.get(6)?),
                    volume: lenient_f64(row.get(7)?),
                    label: lenient_text(row.get(8)?),
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn upsert_summary(&self, row: &SummaryRow) -> Result<(), AlgologError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO pl_summary
                (ticker, total_trades, winning_trades, win_ratio, model_accuracy, total_profit, unrealized_profit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.ticker,
                row.total_trades as i64,
                row.winning_trades as i64,
                row.win_ratio_percent,
                row.model_accuracy_percent,
                row.total_profit,
                row.unrealized_profit
            ],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn summaries(&self) -> Result<Vec<SummaryRow>, AlgologError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT ticker, total_trades, winning_trades, win_ratio, model_accuracy, total_profit, unrealized_profit
                 FROM pl_summary ORDER BY ticker",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| {
                let total: i64 = row.get(1)?;
                let winning: i64 = row.get(2)?;
                Ok(SummaryRow {
                    ticker: row.get(0)?,
                    total_trades: total as usize,
                    winning_trades: winning as usize,
                    win_ratio_percent: row.get(3)?,
                    model_accuracy_percent: row.get(4)?,
                    total_profit: row.get(5)?,
                    unrealized_profit: row.get(6)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn upsert_model_accuracy(&self, row: &ModelAccuracyRow) -> Result<(), AlgologError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO model_accuracy (model, date, accuracy) VALUES (?1, ?2, ?3)",
            params![row.model, row.date, row.accuracy_percent],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn append_predictions(&self, rows: &[PredictionRow]) -> Result<(), AlgologError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for row in rows {
            tx.execute(
                "INSERT INTO ml_predictions (date, ticker, rsi, macd, volume, predicted, actual, correct)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.date,
                    row.ticker,
                    row.rsi,
                    row.macd,
                    row.volume,
                    row.predicted,
                    row.actual,
                    row.correct
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(date: &str, close: f64, label: &str) -> SignalRow {
        SignalRow {
            ticker: "TCS.NS".into(),
            date: date.into(),
            close: Some(close),
            rsi: Some(25.0),
            ma_short: Some(100.0),
            ma_long: Some(98.5),
            macd: Some(0.1234),
            volume: Some(12000.0),
            label: label.into(),
        }
    }

    fn summary(ticker: &str, trades: usize) -> SummaryRow {
        SummaryRow {
            ticker: ticker.into(),
            total_trades: trades,
            winning_trades: 1,
            win_ratio_percent: 50.0,
            model_accuracy_percent: 0.0,
            total_profit: 12.5,
            unrealized_profit: None,
        }
    }

    fn settings(ledger_path: Option<String>) -> Settings {
        use crate::adapters::file_config_adapter::FileConfigAdapter;
        use crate::domain::config_validation::build_settings;

        let config = FileConfigAdapter::from_string(
            "[universe]\ntickers = TCS.NS\nstart_date = 2024-01-01\nend_date = 2024-12-31\n\
             [ledger]\npool_size = 2\n",
        )
        .unwrap();
        let mut settings = build_settings(&config).unwrap();
        settings.ledger_path = ledger_path;
        settings
    }

    #[test]
    fn from_settings_requires_path() {
        let err = SqliteLedger::from_settings(&settings(None)).err().unwrap();
        assert!(matches!(
            err,
            AlgologError::ConfigMissing { ref section, ref key } if section == "ledger" && key == "path"
        ));
    }

    #[test]
    fn from_settings_opens_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db").display().to_string();

        let ledger = SqliteLedger::from_settings(&settings(Some(path.clone()))).unwrap();
        assert_eq!(ledger.pool.max_size(), 2);
        ledger.upsert_signals(&[signal("2024-01-02", 100.0, "BUY")]).unwrap();

        let reopened = SqliteLedger::from_settings(&settings(Some(path))).unwrap();
        assert_eq!(reopened.signal_history("TCS.NS").unwrap().len(), 1);
    }

    #[test]
    fn insert_then_duplicate() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let rows = vec![signal("2024-01-02", 100.0, "BUY"), signal("2024-01-05", 110.0, "SELL")];

        let first = ledger.upsert_signals(&rows).unwrap();
        assert_eq!(first.inserted, 2);

        let second = ledger.upsert_signals(&rows).unwrap();
        assert_eq!(
            second,
            UpsertOutcome {
                inserted: 0,
                updated: 0,
                duplicates: 2
            }
        );
        assert_eq!(ledger.signal_history("TCS.NS").unwrap().len(), 2);
    }

    #[test]
    fn changed_row_updates_in_place() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger
            .upsert_signals(&[signal("2024-01-02", 100.0, "BUY"), signal("2024-01-01", 90.0, "BUY")])
            .unwrap();

        let outcome = ledger
            .upsert_signals(&[signal("2024-01-02", 101.0, "BUY")])
            .unwrap();
        assert_eq!(outcome.updated, 1);

        let history = ledger.signal_history("TCS.NS").unwrap();
        assert_eq!(history.len(), 2);
        // arrival order, not date order
        assert_eq!(history[0].date, "2024-01-02");
        assert_eq!(history[0].close, Some(101.0));
        assert_eq!(history[1].date, "2024-01-01");
    }

    #[test]
    fn history_is_per_ticker() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let mut other = signal("2024-01-02", 50.0, "SELL");
        other.ticker = "INFY.NS".into();
        ledger
            .upsert_signals(&[signal("2024-01-02", 100.0, "BUY"), other])
            .unwrap();

        assert_eq!(ledger.signal_history("TCS.NS").unwrap().len(), 1);
        assert_eq!(ledger.signal_history("INFY.NS").unwrap()[0].label, "SELL");
        assert!(ledger.signal_history("HDFC.NS").unwrap().is_empty());
    }

    #[test]
    fn lenient_reads_of_hand_edited_rows() {
        let ledger = SqliteLedger::in_memory().unwrap();
        {
            let conn = ledger.conn().unwrap();
            conn.execute(
                "INSERT INTO signals (ticker, date, close, label) VALUES ('TCS.NS', '2024-01-03', ' 101.5 ', 'buy')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO signals (ticker, date, close, label) VALUES ('TCS.NS', '2024-01-04', NULL, 'SELL')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO signals (ticker, date, close, label) VALUES ('TCS.NS', '2024-01-05', 'n/a', 'SELL')",
                [],
            )
            .unwrap();
        }

        let history = ledger.signal_history("TCS.NS").unwrap();
        assert_eq!(history[0].close, Some(101.5));
        assert_eq!(history[0].label, "buy");
        assert_eq!(history[0].rsi, None);
        assert_eq!(history[1].close, None);
        assert_eq!(history[2].close, None);
    }

    #[test]
    fn summary_upsert_keeps_one_row_per_ticker() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.upsert_summary(&summary("TCS.NS", 2)).unwrap();
        ledger.upsert_summary(&summary("INFY.NS", 1)).unwrap();
        ledger.upsert_summary(&summary("TCS.NS", 3)).unwrap();

        let rows = ledger.summaries().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "INFY.NS");
        assert_eq!(rows[1].total_trades, 3);
    }

    #[test]
    fn summary_round_trips_unrealized() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let mut row = summary("TCS.NS", 1);
        row.unrealized_profit = Some(-4.25);
        ledger.upsert_summary(&row).unwrap();
        assert_eq!(ledger.summaries().unwrap()[0], row);
    }

    #[test]
    fn model_accuracy_keyed_by_model_and_date() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let row = |acc: f64, date: &str| ModelAccuracyRow {
            model: "DecisionTreeClassifier".into(),
            accuracy_percent: acc,
            date: date.into(),
        };
        ledger.upsert_model_accuracy(&row(50.0, "2024-06-01")).unwrap();
        ledger.upsert_model_accuracy(&row(75.0, "2024-06-01")).unwrap();
        ledger.upsert_model_accuracy(&row(60.0, "2024-06-02")).unwrap();

        let rows = ledger.model_accuracy("DecisionTreeClassifier").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].accuracy_percent, 75.0);
    }

    #[test]
    fn predictions_are_appended() {
        let ledger = SqliteLedger::in_memory().unwrap();
        let row = PredictionRow {
            date: "2024-06-01".into(),
            ticker: "TCS.NS".into(),
            rsi: 22.5,
            macd: -0.5,
            volume: 1000.0,
            predicted: "BUY".into(),
            actual: "BUY".into(),
            correct: true,
        };
        ledger.append_predictions(&[row.clone()]).unwrap();
        ledger.append_predictions(&[row]).unwrap();
        assert_eq!(ledger.prediction_count("TCS.NS").unwrap(), 2);
    }
}
