//! Typed result cache over a [`KvStore`] namespace.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::KvStore;

/// A cached value with its freshness window.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Caches expensive check results for a fixed TTL.
///
/// Expired entries read as absent and are deleted on access.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KvStore>,
    namespace: String,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            ttl,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read a fresh entry. Undecodable entries are dropped and read as absent.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<CachedEntry<T>>, StoreError> {
        let Some(stored) = self.store.get(&self.namespace, key).await? else {
            // Expired rows are invisible to `get`; make sure they do not linger.
            self.store.delete(&self.namespace, key).await?;
            return Ok(None);
        };

        match serde_json::from_value(stored.value) {
            Ok(value) => {
                debug!("Cache hit for {}/{}", self.namespace, key);
                Ok(Some(CachedEntry {
                    value,
                    cached_at: stored.cached_at,
                    expires_at: stored.expires_at,
                }))
            }
            Err(e) => {
                warn!("Dropping undecodable cache entry {}/{}: {}", self.namespace, key, e);
                self.store.delete(&self.namespace, key).await?;
                Ok(None)
            }
        }
    }

    pub async fn put<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.store
            .put(&self.namespace, key, value, Some(self.ttl))
            .await
    }

    pub async fn invalidate(&self, key: &str) -> Result<bool, StoreError> {
        self.store.delete(&self.namespace, key).await
    }
}
