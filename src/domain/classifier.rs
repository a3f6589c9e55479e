//! Classifier evaluation over labelled signals.
//!
//! Features are `[rsi, ma_short, ma_long]` and labels are the BUY/SELL of each
//! signal. The rows are split chronologically (no shuffling): the last
//! `ceil(20%)` rows form the test set, the classifier is trained on the rest and
//! scored on the test rows.

use crate::domain::error::AlgologError;
use crate::domain::signal::{round_to, Signal, SignalRecord, SignalSeries};
use crate::ports::classifier_port::ClassifierPort;
use chrono::NaiveDate;

pub const MIN_TRAINING_ROWS: usize = 10;
pub const DEFAULT_MODEL: &str = "DecisionTreeClassifier";

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub ticker: String,
    pub date: NaiveDate,
    pub rsi: f64,
    pub macd: f64,
    pub volume: f64,
    pub predicted: Signal,
    pub actual: Signal,
}

impl Prediction {
    pub fn correct(&self) -> bool {
        self.predicted == self.actual
    }

    pub fn to_row(&self) -> PredictionRow {
        PredictionRow {
            date: self.date.format("%Y-%m-%d").to_string(),
            ticker: self.ticker.clone(),
            rsi: round_to(self.rsi, 2),
            macd: round_to(self.macd, 4),
            volume: self.volume,
            predicted: self.predicted.to_string(),
            actual: self.actual.to_string(),
            correct: self.correct(),
        }
    }
}

/// Prediction as stored by the ledger sink.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub date: String,
    pub ticker: String,
    pub rsi: f64,
    pub macd: f64,
    pub volume: f64,
    pub predicted: String,
    pub actual: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub model: String,
    pub predictions: Vec<Prediction>,
    /// Fraction of test rows predicted correctly, in [0, 1].
    pub accuracy: f64,
}

pub fn features(record: &SignalRecord) -> Vec<f64> {
    vec![record.rsi, record.ma_short, record.ma_long]
}

/// Split point for `n` rows: (train, test) sizes.
pub fn split_sizes(n: usize) -> (usize, usize) {
    // 20% of the rows, rounded up
    let test = n.div_ceil(5);
    (n - test, test)
}

pub fn evaluate(
    classifier: &mut dyn ClassifierPort,
    signals: &SignalSeries,
) -> Result<Evaluation, AlgologError> {
    let n = signals.len();
    if n < MIN_TRAINING_ROWS {
        return Err(AlgologError::InsufficientHistory {
            ticker: signals.ticker.clone(),
            have: n,
            need: MIN_TRAINING_ROWS,
        });
    }

    let (train_len, _) = split_sizes(n);
    let (train, test) = signals.records.split_at(train_len);

    let train_x: Vec<Vec<f64>> = train.iter().map(features).collect();
    let train_y: Vec<Signal> = train.iter().map(|r| r.label).collect();
    classifier.fit(&train_x, &train_y)?;

    let test_x: Vec<Vec<f64>> = test.iter().map(features).collect();
    let predicted = classifier.predict(&test_x)?;
    if predicted.len() != test.len() {
        return Err(AlgologError::Classifier {
            reason: format!(
                "{} returned {} predictions for {} rows",
                classifier.name(),
                predicted.len(),
                test.len()
            ),
        });
    }

    let predictions: Vec<Prediction> = test
        .iter()
        .zip(predicted)
        .map(|(record, predicted)| Prediction {
            ticker: record.ticker.clone(),
            date: record.date,
            rsi: record.rsi,
            macd: record.macd,
            volume: record.volume,
            predicted,
            actual: record.label,
        })
        .collect();

    let correct = predictions.iter().filter(|p| p.correct()).count();
    let accuracy = correct as f64 / predictions.len() as f64;

    tracing::info!(
        ticker = %signals.ticker,
        model = classifier.name(),
        train = train_len,
        test = predictions.len(),
        accuracy,
        "classifier evaluated"
    );

    Ok(Evaluation {
        model: classifier.name().to_string(),
        predictions,
        accuracy,
    })
}
