//! CART decision tree classifier adapter.
//!
//! Binary splits on midpoints between sorted distinct feature values, chosen by
//! Gini impurity decrease. Features are scanned in order and the first best
//! split wins, so training is deterministic.

use crate::domain::classifier::DEFAULT_MODEL;
use crate::domain::config_validation::ClassifierSettings;
use crate::domain::error::AlgologError;
use crate::domain::signal::Signal;
use crate::ports::classifier_port::ClassifierPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl From<&ClassifierSettings> for TreeConfig {
    fn from(settings: &ClassifierSettings) -> Self {
        Self {
            max_depth: settings.max_depth,
            min_samples_split: settings.min_samples_split,
            min_samples_leaf: settings.min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(Signal),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, sample: &[f64]) -> Signal {
        match self {
            Node::Leaf(label) => *label,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    config: TreeConfig,
    n_features: usize,
    root: Option<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl DecisionTreeClassifier {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            n_features: 0,
            root: None,
        }
    }

    /// Number of split levels in the fitted tree. A lone leaf (or an unfitted
    /// tree) has depth 0.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map(Node::depth).unwrap_or(0)
    }

    fn build(&self, x: &[Vec<f64>], y: &[Signal], indices: &[usize], depth: usize) -> Node {
        let impurity = gini(y, indices);

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || impurity < 1e-12
        {
            return Node::Leaf(majority(y, indices));
        }

        match self.best_split(x, y, indices, impurity) {
            Some(split) => {
                let left = self.build(x, y, &split.left, depth + 1);
                let right = self.build(x, y, &split.right, depth + 1);
                Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => Node::Leaf(majority(y, indices)),
        }
    }

    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[Signal],
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<BestSplit> {
        let mut best_gain = 0.0;
        let mut best: Option<BestSplit> = None;
        let n = indices.len() as f64;

        for feature in 0..self.n_features {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[i][feature]).collect();
            values.sort_by(f64::total_cmp);
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| x[i][feature] <= threshold);

                if left.len() < self.config.min_samples_leaf
                    || right.len() < self.config.min_samples_leaf
                {
                    continue;
                }

                let weighted = (left.len() as f64 * gini(y, &left)
                    + right.len() as f64 * gini(y, &right))
                    / n;
                let gain = parent_impurity - weighted;

                if gain > best_gain {
                    best_gain = gain;
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        left,
                        right,
                    });
                }
            }
        }

        best
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl ClassifierPort for DecisionTreeClassifier {
    fn name(&self) -> &str {
        DEFAULT_MODEL
    }

    fn fit(&mut self, features: &[Vec<f64>], labels: &[Signal]) -> Result<(), AlgologError> {
        if features.is_empty() {
            return Err(AlgologError::Classifier {
                reason: "cannot fit on an empty training set".into(),
            });
        }
        if features.len() != labels.len() {
            return Err(AlgologError::Classifier {
                reason: format!(
                    "{} feature rows but {} labels",
                    features.len(),
                    labels.len()
                ),
            });
        }
        let n_features = features[0].len();
        if features.iter().any(|row| row.len() != n_features) {
            return Err(AlgologError::Classifier {
                reason: "feature rows have different lengths".into(),
            });
        }
        if features.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AlgologError::Classifier {
                reason: "non-finite feature value".into(),
            });
        }

        self.n_features = n_features;
        let indices: Vec<usize> = (0..features.len()).collect();
        self.root = Some(self.build(features, labels, &indices, 0));
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Signal>, AlgologError> {
        let root = self.root.as_ref().ok_or_else(|| AlgologError::Classifier {
            reason: "predict called before fit".into(),
        })?;

        features
            .iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(AlgologError::Classifier {
                        reason: format!(
                            "expected {} features, got {}",
                            self.n_features,
                            row.len()
                        ),
                    });
                }
                Ok(root.predict(row))
            })
            .collect()
    }
}

fn counts(y: &[Signal], indices: &[usize]) -> (usize, usize) {
    let buys = indices.iter().filter(|&&i| y[i] == Signal::Buy).count();
    (buys, indices.len() - buys)
}

fn gini(y: &[Signal], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let (buys, sells) = counts(y, indices);
    let n = indices.len() as f64;
    let p_buy = buys as f64 / n;
    let p_sell = sells as f64 / n;
    1.0 - p_buy * p_buy - p_sell * p_sell
}

// Ties go to SELL, the lower class index.
fn majority(y: &[Signal], indices: &[usize]) -> Signal {
    let (buys, sells) = counts(y, indices);
    if buys > sells {
        Signal::Buy
    } else {
        Signal::Sell
    }
}
