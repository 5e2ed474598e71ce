//! Store trait and stored value type.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// A value as persisted in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub namespace: String,
    pub key: String,
    pub value: serde_json::Value,
    pub cached_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Compute the expiry instant for a TTL starting at `now`.
pub(crate) fn expiry_from(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    ttl.map(|ttl| {
        now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36500))
    })
}

/// Namespaced JSON key/value store.
///
/// Expired entries are never returned by `get` or `list`.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredValue>, StoreError>;

    /// Insert or replace a value, optionally expiring after `ttl`.
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError>;

    /// Delete a value. Returns whether it existed.
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError>;

    /// List live values in a namespace, ordered by key.
    async fn list(&self, namespace: &str) -> Result<Vec<StoredValue>, StoreError>;

    /// Remove every expired value. Returns the number removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

/// Read and decode a typed value.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(namespace, key).await? {
        Some(stored) => Ok(Some(serde_json::from_value(stored.value)?)),
        None => Ok(None),
    }
}

/// Encode and write a typed value.
pub async fn put_json<T: Serialize + Sync>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value)?;
    store.put(namespace, key, value, ttl).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_none() {
        assert!(expiry_from(Utc::now(), None).is_none());
    }

    #[test]
    fn test_is_expired_at() {
        let now = Utc::now();
        let value = StoredValue {
            namespace: "ns".to_string(),
            key: "k".to_string(),
            value: serde_json::json!(1),
            cached_at: now,
            expires_at: expiry_from(now, Some(Duration::from_secs(60))),
        };
        assert!(!value.is_expired_at(now));
        assert!(value.is_expired_at(now + chrono::Duration::seconds(61)));
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let now = Utc::now();
        let value = StoredValue {
            namespace: "ns".to_string(),
            key: "k".to_string(),
            value: serde_json::json!(1),
            cached_at: now,
            expires_at: None,
        };
        assert!(!value.is_expired_at(now + chrono::Duration::days(3650)));
    }
}
