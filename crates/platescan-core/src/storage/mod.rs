//! Key-value storage backends
//!
//! All persisted app state (quota counters, limit overrides, session blobs)
//! goes through the `KeyValueStore` trait, so services can run against
//! SQLite in the app and against an in-memory store in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::Database;
use crate::error::Result;

// ============================================================================
// Trait
// ============================================================================

/// String key-value storage for persisted app state
///
/// Values are opaque strings; callers handle their own serialization.
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value for a key, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the value for a key, overwriting any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key, succeeding silently if the key is absent
    async fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// SQLite-backed store
// ============================================================================

/// Key-value store backed by the `kv_store` table
#[derive(Clone)]
pub struct SqliteKvStore {
    db: Database,
}

impl SqliteKvStore {
    /// Create a new store over an open database
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        log::debug!("[storage:sqlite] Setting key {}", key);

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.db.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        log::debug!("[storage:sqlite] Removing key {}", key);

        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory key-value store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no keys
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryKvStore::new();
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("quota.usage", "{\"count\":1}").await.unwrap();
        assert_eq!(
            store.get("quota.usage").await.unwrap().as_deref(),
            Some("{\"count\":1}")
        );

        store.remove("quota.usage").await.unwrap();
        assert!(store.get("quota.usage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_overwrite() {
        let store = MemoryKvStore::new();
        store.set("k", "first").await.unwrap();
        store.set("k", "second").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_remove_absent_is_ok() {
        let store = MemoryKvStore::new();
        store.remove("never-set").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("kv.db")).await.unwrap();
        let store = SqliteKvStore::new(db);

        assert!(store.get("missing").await.unwrap().is_none());

        store.set("session.profile", "{}").await.unwrap();
        assert_eq!(
            store.get("session.profile").await.unwrap().as_deref(),
            Some("{}")
        );

        // Upsert replaces the value in place
        store.set("session.profile", "{\"v\":2}").await.unwrap();
        assert_eq!(
            store.get("session.profile").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );

        store.remove("session.profile").await.unwrap();
        assert!(store.get("session.profile").await.unwrap().is_none());
    }
}
