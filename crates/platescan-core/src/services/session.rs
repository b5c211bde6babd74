//! User session persistence
//!
//! Stores the signed-in user's profile as a versioned JSON envelope in the
//! key-value store. Stale or unreadable envelopes are evicted at read time,
//! so a profile never outlives the retention window.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::KeyValueStore;

// ============================================================================
// Constants
// ============================================================================

/// Key holding the serialized session envelope
const SESSION_KEY: &str = "session.profile";

/// Envelope format version; bumping it invalidates older blobs
const SESSION_VERSION: u32 = 1;

/// Sessions older than this are evicted when read
pub const MAX_SESSION_AGE_DAYS: i64 = 30;

// ============================================================================
// Types
// ============================================================================

/// The locally persisted user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub daily_calorie_target: Option<i32>,
    pub dietary_notes: Option<String>,
}

impl UserProfile {
    /// New profile with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            daily_calorie_target: None,
            dietary_notes: None,
        }
    }

    pub fn with_calorie_target(mut self, target: i32) -> Self {
        self.daily_calorie_target = Some(target);
        self
    }

    pub fn with_dietary_notes(mut self, notes: impl Into<String>) -> Self {
        self.dietary_notes = Some(notes.into());
        self
    }
}

/// Versioned persistence envelope around the profile
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    version: u32,
    saved_at: DateTime<Utc>,
    profile: UserProfile,
}

// ============================================================================
// Session Store
// ============================================================================

/// Storage layer for the user session
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist the profile, stamped with the current time
    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        let envelope = StoredSession {
            version: SESSION_VERSION,
            saved_at: Utc::now(),
            profile: profile.clone(),
        };

        let json = serde_json::to_string(&envelope)?;
        self.store.set(SESSION_KEY, &json).await?;
        log::debug!("[session:store] Saved profile {}", profile.id);
        Ok(())
    }

    /// Load the stored profile, if a current one exists
    ///
    /// Eviction happens here: deserialization failures, version mismatches,
    /// and envelopes older than [`MAX_SESSION_AGE_DAYS`] all remove the blob
    /// and read as `None`.
    pub async fn load(&self) -> Result<Option<UserProfile>> {
        let Some(raw) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };

        let envelope: StoredSession = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("[session:store] Discarding unreadable session blob: {}", e);
                self.store.remove(SESSION_KEY).await?;
                return Ok(None);
            }
        };

        if envelope.version != SESSION_VERSION {
            log::warn!(
                "[session:store] Discarding session with unknown version {}",
                envelope.version
            );
            self.store.remove(SESSION_KEY).await?;
            return Ok(None);
        }

        let age_days = (Utc::now() - envelope.saved_at).num_days();
        if age_days > MAX_SESSION_AGE_DAYS {
            log::info!("[session:store] Evicting session saved {} days ago", age_days);
            self.store.remove(SESSION_KEY).await?;
            return Ok(None);
        }

        Ok(Some(envelope.profile))
    }

    /// Remove any stored session
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(SESSION_KEY).await?;
        log::info!("[session:store] Session cleared");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;

    fn session_store() -> (Arc<MemoryKvStore>, SessionStore) {
        let backend = Arc::new(MemoryKvStore::new());
        let store = SessionStore::new(backend.clone());
        (backend, store)
    }

    /// Write an envelope with a chosen age straight into the backend
    async fn seed_envelope(backend: &MemoryKvStore, version: u32, age_days: i64) {
        let envelope = StoredSession {
            version,
            saved_at: Utc::now() - chrono::Duration::days(age_days),
            profile: UserProfile::new("Dana"),
        };
        backend
            .set(SESSION_KEY, &serde_json::to_string(&envelope).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let (_, store) = session_store();
        let profile = UserProfile::new("Dana")
            .with_calorie_target(2200)
            .with_dietary_notes("vegetarian");

        store.save(&profile).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, profile);
        assert_eq!(loaded.daily_calorie_target, Some(2200));
    }

    #[tokio::test]
    async fn test_load_without_session() {
        let (_, store) = session_store();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_session_is_evicted_on_read() {
        let (backend, store) = session_store();
        seed_envelope(&backend, SESSION_VERSION, MAX_SESSION_AGE_DAYS + 1).await;

        assert!(store.load().await.unwrap().is_none());
        // The blob itself is gone, not just ignored
        assert!(backend.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_at_age_boundary_survives() {
        let (backend, store) = session_store();
        seed_envelope(&backend, SESSION_VERSION, MAX_SESSION_AGE_DAYS).await;

        assert!(store.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_version_is_evicted() {
        let (backend, store) = session_store();
        seed_envelope(&backend, 99, 0).await;

        assert!(store.load().await.unwrap().is_none());
        assert!(backend.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_evicted() {
        let (backend, store) = session_store();
        backend.set(SESSION_KEY, "{not json").await.unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert!(backend.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let (_, store) = session_store();
        store.save(&UserProfile::new("Dana")).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
