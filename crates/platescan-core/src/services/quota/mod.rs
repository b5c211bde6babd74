//! Daily quota module
//!
//! Tracks how many meal analyses ran today and enforces a configurable
//! daily limit. The counter lives in the key-value store and rolls over
//! lazily at local midnight.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ QuotaStore                                              │
//! │   - current_usage()      lazy rollover on read          │
//! │   - can_perform_analysis()                              │
//! │   - increment_usage()                                   │
//! │   - set_limit() / reset_today() / usage_stats()         │
//! └─────────────────────────────────────────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │ trait KeyValueStore (storage module)                    │
//! │   quota.usage  -> QuotaRecord JSON                      │
//! │   quota.limit  -> daily limit override                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads fail closed: when the backend is unreadable the store reports a
//! limit-0 record and analyses stay blocked until storage recovers.

pub mod store;
pub mod types;

// Re-export main types
pub use types::{QuotaCheck, QuotaRecord, UsageStats};

// Re-export store
pub use store::{QuotaStore, DEFAULT_DAILY_LIMIT};
