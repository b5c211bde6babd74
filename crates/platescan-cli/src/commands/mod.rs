//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod analyze;
pub mod quota;
pub mod session;

use std::sync::Arc;

use platescan_core::{Database, KeyValueStore, SqliteKvStore};

use crate::output::OutputFormat;

/// Shared context for all commands
pub struct Context {
    pub db: Database,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// Key-value store view over the open database
    pub fn kv_store(&self) -> Arc<dyn KeyValueStore> {
        Arc::new(SqliteKvStore::new(self.db.clone()))
    }
}
