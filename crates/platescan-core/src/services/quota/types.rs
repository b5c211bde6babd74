//! Daily quota types
//!
//! Types for the per-day analysis counter and the views derived from it.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Quota Record
// ============================================================================

/// The persisted per-day usage counter
///
/// Exactly one record exists at a time, serialized as JSON in the key-value
/// store. A read that observes a stale `day` rolls the counter over to the
/// current day in place; the record is never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    /// Local calendar day this count applies to
    pub day: NaiveDate,
    /// Analyses performed on `day`
    pub count: u32,
    /// Daily limit in effect when the record was read
    pub limit: u32,
}

impl QuotaRecord {
    /// Fresh record for a day with a zero count
    pub fn fresh(day: NaiveDate, limit: u32) -> Self {
        Self {
            day,
            count: 0,
            limit,
        }
    }

    /// Record representing the blocked state used when reads fail
    ///
    /// `limit` is zero, so no analysis is allowed until storage recovers.
    pub fn blocked(day: NaiveDate) -> Self {
        Self {
            day,
            count: 0,
            limit: 0,
        }
    }
}

// ============================================================================
// Quota Check
// ============================================================================

/// Result of a pre-analysis quota check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaCheck {
    /// Whether another analysis may run today
    pub allowed: bool,
    /// The usage record backing the decision
    pub usage: QuotaRecord,
    /// Analyses left today
    pub remaining: u32,
}

// ============================================================================
// Usage Stats
// ============================================================================

/// Usage statistics derived from the current record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    /// Today's record
    pub current: QuotaRecord,
    /// Percentage of the daily limit used (0-100, capped)
    pub percentage: f64,
    /// Whether the count has reached the limit
    pub is_over_limit: bool,
    /// Next local midnight, when the counter rolls over
    pub next_reset: NaiveDateTime,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_fresh_record() {
        let record = QuotaRecord::fresh(day("2026-08-21"), 7);
        assert_eq!(record.count, 0);
        assert_eq!(record.limit, 7);
        assert_eq!(record.day, day("2026-08-21"));
    }

    #[test]
    fn test_blocked_record_has_zero_limit() {
        let record = QuotaRecord::blocked(day("2026-08-21"));
        assert_eq!(record.count, 0);
        assert_eq!(record.limit, 0);
    }

    #[test]
    fn test_record_json_roundtrip() {
        let record = QuotaRecord {
            day: day("2026-08-21"),
            count: 3,
            limit: 7,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"2026-08-21\""));

        let parsed: QuotaRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_parses_stored_shape() {
        // Shape written by earlier app versions must keep parsing
        let json = r#"{"day":"2026-08-20","count":5,"limit":7}"#;
        let parsed: QuotaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.count, 5);
        assert_eq!(parsed.day, day("2026-08-20"));
    }
}
