//! SQLite-backed store.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::error::StoreError;
use crate::schema::init_schema;
use crate::store::{KvStore, StoredValue, expiry_from};

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;

/// Raw row as read from the `kv` table.
type Row = (String, String, String, i64, Option<i64>);

/// SQLite-based store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Open (or create) a file-backed database, creating parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        debug!("Opening store at {}", path.display());
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { conn })
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

fn decode(row: Row) -> Result<StoredValue, StoreError> {
    let (namespace, key, value, cached_at, expires_at) = row;
    Ok(StoredValue {
        namespace,
        key,
        value: serde_json::from_str(&value)?,
        cached_at: from_millis(cached_at),
        expires_at: expires_at.map(from_millis),
    })
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        let now = Utc::now().timestamp_millis();

        let row: Option<Row> = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT namespace, key, value, cached_at, expires_at FROM kv
                         WHERE namespace = ?1 AND key = ?2
                           AND (expires_at IS NULL OR expires_at > ?3)",
                        params![namespace, key, now],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(decode).transpose()
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        let value = serde_json::to_string(&value)?;
        let now = Utc::now();
        let cached_at = now.timestamp_millis();
        let expires_at = expiry_from(now, ttl).map(|t| t.timestamp_millis());

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kv (namespace, key, value, cached_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(namespace, key) DO UPDATE SET
                         value = excluded.value,
                         cached_at = excluded.cached_at,
                         expires_at = excluded.expires_at",
                    params![namespace, key, value, cached_at, expires_at],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let namespace = namespace.to_string();
        let key = key.to_string();

        let affected = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
                    params![namespace, key],
                )?)
            })
            .await?;

        Ok(affected > 0)
    }

    async fn list(&self, namespace: &str) -> Result<Vec<StoredValue>, StoreError> {
        let namespace = namespace.to_string();
        let now = Utc::now().timestamp_millis();

        let rows: Vec<Row> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT namespace, key, value, cached_at, expires_at FROM kv
                     WHERE namespace = ?1 AND (expires_at IS NULL OR expires_at > ?2)
                     ORDER BY key",
                )?;
                let rows = stmt
                    .query_map(params![namespace, now], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(decode).collect()
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now().timestamp_millis();

        let purged = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![now],
                )?)
            })
            .await?;

        if purged > 0 {
            debug!("Purged {} expired store entries", purged);
        }
        Ok(purged)
    }
}
