//! In-memory store for testing.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{KvStore, StoredValue, expiry_from};

/// In-memory store. Contents are lost when dropped.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<(String, String), StoredValue>>,
}

impl MemoryStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(namespace.to_string(), key.to_string()))
            .filter(|stored| !stored.is_expired())
            .cloned())
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let stored = StoredValue {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
            cached_at: now,
            expires_at: expiry_from(now, ttl),
        };
        let mut entries = self.entries.write().await;
        entries.insert((namespace.to_string(), key.to_string()), stored);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<StoredValue>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|stored| stored.namespace == namespace && !stored.is_expired())
            .cloned()
            .collect())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired_at(now));
        Ok(before - entries.len())
    }
}
