//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod decision_tree;
pub mod file_config_adapter;
pub mod retry;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
