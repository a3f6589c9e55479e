//! Core domain types and logic.

pub mod classifier;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod pipeline;
pub mod position;
pub mod price;
pub mod reconcile;
pub mod signal;
pub mod window;
