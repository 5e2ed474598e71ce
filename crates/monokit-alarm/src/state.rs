//! Persisted per-key alarm state.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use monokit_store::{KvStore, get_json, put_json};

use crate::error::AlarmError;

/// Store namespace holding alarm states.
pub const ALARM_NAMESPACE: &str = "alarm";

/// Observed health of an alarm key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Unknown,
    Up,
    Down,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Unknown => write!(f, "unknown"),
            HealthState::Up => write!(f, "up"),
            HealthState::Down => write!(f, "down"),
        }
    }
}

/// Alarm state of one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmState {
    pub key: String,
    #[serde(default)]
    pub last_state: HealthState,
    #[serde(default)]
    pub last_notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub issue_id: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl AlarmState {
    /// A key never seen before.
    pub fn unknown(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            last_state: HealthState::Unknown,
            last_notified_at: None,
            consecutive_failures: 0,
            issue_id: None,
            updated_at: Utc::now(),
        }
    }
}

/// Alarm state persistence over a [`KvStore`].
#[derive(Clone)]
pub struct AlarmStore {
    store: Arc<dyn KvStore>,
}

impl AlarmStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Load a key's state. Missing or unreadable state is Unknown.
    pub async fn load(&self, key: &str) -> AlarmState {
        match get_json::<AlarmState>(self.store.as_ref(), ALARM_NAMESPACE, key).await {
            Ok(Some(state)) => state,
            Ok(None) => AlarmState::unknown(key),
            Err(e) => {
                warn!("Alarm state for '{}' unreadable, assuming unknown: {}", key, e);
                AlarmState::unknown(key)
            }
        }
    }

    pub async fn save(&self, state: &AlarmState) -> Result<(), AlarmError> {
        put_json(self.store.as_ref(), ALARM_NAMESPACE, &state.key, state, None).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, AlarmError> {
        Ok(self.store.delete(ALARM_NAMESPACE, key).await?)
    }

    /// Every stored state, ordered by key. Undecodable entries are skipped.
    pub async fn list(&self) -> Result<Vec<AlarmState>, AlarmError> {
        let stored = self.store.list(ALARM_NAMESPACE).await?;
        Ok(stored
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry.value) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Skipping undecodable alarm state '{}': {}", entry.key, e);
                    None
                }
            })
            .collect())
    }
}
