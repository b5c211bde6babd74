//! Per-day result cache
//!
//! Memoizes validated estimates by image content and local day, so a photo
//! analyzed twice in one day costs a single quota unit. Entries keyed to
//! any other day are dead weight and get evicted on insert.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};

use super::types::{MealImage, NutritionEstimate};

// ============================================================================
// Fingerprint
// ============================================================================

/// Cache key: content hash of the image bytes plus the local day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Hex SHA-256 of the image bytes
    pub content_hash: String,
    /// Local calendar day the analysis belongs to
    pub day: NaiveDate,
}

impl Fingerprint {
    /// Fingerprint for an image analyzed today
    pub fn for_image(image: &MealImage) -> Self {
        Self {
            content_hash: image.content_hash(),
            day: Local::now().date_naive(),
        }
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = &self.content_hash[..self.content_hash.len().min(12)];
        write!(f, "{}:{}", prefix, self.day)
    }
}

// ============================================================================
// Result Cache
// ============================================================================

/// In-process estimate cache, bounded by day
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<Fingerprint, NutritionEstimate>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached estimate for a fingerprint, if any
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<NutritionEstimate> {
        self.entries.get(fingerprint).cloned()
    }

    /// Store an estimate, evicting entries from other days
    pub fn put(&mut self, fingerprint: Fingerprint, estimate: NutritionEstimate) {
        let day = fingerprint.day;
        let before = self.entries.len();
        self.entries.retain(|key, _| key.day == day);

        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::debug!("[analysis:cache] Evicted {} stale entries", evicted);
        }

        self.entries.insert(fingerprint, estimate);
    }

    /// Drop every cached estimate
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached estimates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
