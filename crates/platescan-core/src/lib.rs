//! # platescan-core
//!
//! Core meal analysis logic for Platescan - shared between the CLI and the
//! mobile shell.
//!
//! This crate provides:
//! - Database operations (`db` module)
//! - Key-value persistence (`storage` module)
//! - Quota, analysis, and session services (`services` module)
//! - Unified error handling (`error` module)

pub mod db;
pub mod error;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use db::Database;
pub use error::{Error, Result};
pub use storage::{KeyValueStore, MemoryKvStore, SqliteKvStore};

// Re-export commonly used types from services
pub use services::{
    AnalysisConfig, AnalysisError, ClassifierConfig, MealAnalyzer, MealImage, NutritionEstimate,
    ProviderId, QuotaCheck, QuotaRecord, QuotaStore, SessionStore, UsageStats, UserProfile,
    VisionConfig, DEFAULT_DAILY_LIMIT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}
