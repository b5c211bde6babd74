//! Daily quota store
//!
//! Persists the day-scoped analysis counter in the key-value store. Rollover
//! is lazy: every read compares the stored day against the current local day
//! and resets a stale record in place, so no background timer is needed.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::storage::KeyValueStore;

use super::types::{QuotaCheck, QuotaRecord, UsageStats};

// ============================================================================
// Constants
// ============================================================================

/// Daily analysis limit used when no override is stored
pub const DEFAULT_DAILY_LIMIT: u32 = 7;

/// Key holding the JSON-serialized quota record
const USAGE_KEY: &str = "quota.usage";

/// Key holding the daily limit override
const LIMIT_KEY: &str = "quota.limit";

// ============================================================================
// QuotaStore
// ============================================================================

/// Storage layer for the per-day analysis counter
///
/// Reads degrade to a blocked (limit-0) record when the backend fails, so a
/// broken store never lets analyses through. `increment_usage` and
/// `set_limit` surface their errors instead; the caller decides what a lost
/// write means for the analysis it just performed.
pub struct QuotaStore {
    store: Arc<dyn KeyValueStore>,
}

impl QuotaStore {
    /// Create a new store over a key-value backend
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Configured daily limit
    ///
    /// Falls back to `DEFAULT_DAILY_LIMIT` when the override is unset,
    /// unparseable, or unreadable.
    pub async fn limit(&self) -> u32 {
        match self.read_limit().await {
            Ok(limit) => limit,
            Err(e) => {
                log::warn!("[quota:store] Failed to read limit: {}", e);
                DEFAULT_DAILY_LIMIT
            }
        }
    }

    /// Persist a new daily limit
    ///
    /// Takes effect on the next read; today's count is not rescaled.
    pub async fn set_limit(&self, limit: u32) -> Result<()> {
        if limit == 0 {
            return Err(Error::validation("Daily limit must be greater than zero"));
        }

        self.store.set(LIMIT_KEY, &limit.to_string()).await?;
        log::info!("[quota:store] Daily limit set to {}", limit);
        Ok(())
    }

    /// Today's usage record, rolling over a stale day as a side effect
    ///
    /// Storage failures degrade to the blocked record rather than
    /// propagating.
    pub async fn current_usage(&self) -> QuotaRecord {
        let today = Local::now().date_naive();
        match self.read_usage(today).await {
            Ok(record) => record,
            Err(e) => {
                log::error!(
                    "[quota:store] Failed to read usage, blocking analyses: {}",
                    e
                );
                QuotaRecord::blocked(today)
            }
        }
    }

    /// Check whether another analysis may run today
    pub async fn can_perform_analysis(&self) -> QuotaCheck {
        let usage = self.current_usage().await;
        let allowed = usage.count < usage.limit;
        let remaining = usage.limit.saturating_sub(usage.count);

        QuotaCheck {
            allowed,
            usage,
            remaining,
        }
    }

    /// Record one analysis against today's counter
    ///
    /// Re-reads the current record first so a pending rollover is applied
    /// before counting. The store never clamps at the limit; gating is the
    /// orchestrator's job.
    pub async fn increment_usage(&self) -> Result<QuotaRecord> {
        let today = Local::now().date_naive();
        let mut record = self.read_usage(today).await?;

        record.count += 1;
        self.persist(&record).await?;

        log::debug!(
            "[quota:store] Usage incremented to {}/{}",
            record.count,
            record.limit
        );
        Ok(record)
    }

    /// Force today's count back to zero, preserving the limit
    pub async fn reset_today(&self) -> Result<()> {
        let today = Local::now().date_naive();
        let limit = self.read_limit().await?;

        self.persist(&QuotaRecord::fresh(today, limit)).await?;
        log::info!("[quota:store] Usage reset for {}", today);
        Ok(())
    }

    /// Usage statistics for display surfaces
    pub async fn usage_stats(&self) -> UsageStats {
        let current = self.current_usage().await;

        let percentage = if current.limit == 0 {
            100.0
        } else {
            (current.count as f64 / current.limit as f64 * 100.0).min(100.0)
        };
        let is_over_limit = current.count >= current.limit;
        let next_reset = next_local_midnight(current.day);

        UsageStats {
            current,
            percentage,
            is_over_limit,
            next_reset,
        }
    }

    /// Read the record for `today`, creating or rolling it over as needed
    async fn read_usage(&self, today: NaiveDate) -> Result<QuotaRecord> {
        let limit = self.read_limit().await?;

        let stored = match self.store.get(USAGE_KEY).await? {
            Some(raw) => serde_json::from_str::<QuotaRecord>(&raw)?,
            None => {
                log::debug!("[quota:store] No usage record, starting fresh for {}", today);
                let record = QuotaRecord::fresh(today, limit);
                self.persist(&record).await?;
                return Ok(record);
            }
        };

        if stored.day != today {
            log::info!(
                "[quota:store] Rolling over usage from {} to {}",
                stored.day,
                today
            );
            let rolled = QuotaRecord::fresh(today, limit);
            self.persist(&rolled).await?;
            return Ok(rolled);
        }

        // Limit overrides apply on read without touching the count
        Ok(QuotaRecord { limit, ..stored })
    }

    async fn read_limit(&self) -> Result<u32> {
        Ok(match self.store.get(LIMIT_KEY).await? {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("[quota:store] Unparseable limit override: {}", raw);
                DEFAULT_DAILY_LIMIT
            }),
            None => DEFAULT_DAILY_LIMIT,
        })
    }

    async fn persist(&self, record: &QuotaRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.store.set(USAGE_KEY, &json).await
    }
}

/// Midnight at the start of the day after `day`
fn next_local_midnight(day: NaiveDate) -> NaiveDateTime {
    day.succ_opt().unwrap_or(day).and_time(NaiveTime::MIN)
}

// ============================================================================
// Tests
// ============================================================================
