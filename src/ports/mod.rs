//! Port traits for the external collaborators of the core.

pub mod classifier_port;
pub mod config_port;
pub mod data_port;
pub mod ledger_port;
