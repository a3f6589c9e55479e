//! Supervised classifier port trait.
//!
//! The classifier is opaque to the core: it is trained on indicator features
//! labelled BUY/SELL and asked to predict labels for unseen rows.

use crate::domain::error::AlgologError;
use crate::domain::signal::Signal;

pub trait ClassifierPort {
    fn name(&self) -> &str;

    fn fit(&mut self, features: &[Vec<f64>], labels: &[Signal]) -> Result<(), AlgologError>;

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Signal>, AlgologError>;
}
