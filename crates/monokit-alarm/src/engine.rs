//! Alarm state machine.
//!
//! Each alarm key moves between Unknown, Up and Down. The first failure
//! notifies and files (or updates) a tracker issue; repeated failures are
//! suppressed until the re-notification interval elapses; the first success
//! after a failure sends exactly one recovery and closes the issue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use monokit_core::{ThrottlePolicy, ThrottleRecord};
use monokit_store::KvStore;

use crate::alert_manager::AlertManager;
use crate::alerts::{Alert, AlertKind};
use crate::config::AlarmConfig;
use crate::error::AlarmError;
use crate::state::{AlarmState, AlarmStore, HealthState};
use crate::tracker::IssueTracker;

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

/// What a check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmOutcome {
    /// Transitioned to Down and notified.
    Notified,
    /// Still Down; notified again (forced or interval elapsed).
    Renotified,
    /// Still Down inside the suppression window.
    Suppressed,
    /// Transitioned to Up and notified.
    Recovered,
    /// No transition and nothing sent.
    Unchanged,
}

/// Per-key up/down alarm engine.
pub struct AlarmEngine {
    config: AlarmConfig,
    policy: ThrottlePolicy,
    alerts: AlertManager,
    tracker: Option<Arc<dyn IssueTracker>>,
    store: AlarmStore,
    hostname: Option<String>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AlarmEngine {
    pub fn new(config: AlarmConfig, alerts: AlertManager, store: Arc<dyn KvStore>) -> Self {
        Self {
            policy: ThrottlePolicy::interval(config.renotify_interval()),
            config,
            alerts,
            tracker: None,
            store: AlarmStore::new(store),
            hostname: None,
            locks: DashMap::new(),
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn IssueTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Host name included in every alert.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Record a failure of `key`.
    pub async fn check_down(&self, key: &str, message: &str, force: bool) -> AlarmOutcome {
        self.check_down_at(key, message, force, Utc::now()).await
    }

    pub async fn check_down_at(
        &self,
        key: &str,
        message: &str,
        force: bool,
        now: DateTime<Utc>,
    ) -> AlarmOutcome {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let mut state = self.store.load(key).await;
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        let outcome = if state.last_state == HealthState::Down {
            let record = ThrottleRecord::from_last(state.last_notified_at);
            let decision = self.policy.decide(&record, now);
            if force || decision.is_allowed() {
                let alert = self.alert(key, AlertKind::StillDown, message, &state, now);
                self.notify(&alert).await;
                state.last_notified_at = Some(now);
                AlarmOutcome::Renotified
            } else {
                debug!("Alarm '{}' suppressed: {:?}", key, decision);
                AlarmOutcome::Suppressed
            }
        } else {
            info!("Alarm '{}' transitioned {} -> down", key, state.last_state);
            state.last_state = HealthState::Down;
            let alert = self.alert(key, AlertKind::Down, message, &state, now);
            self.notify(&alert).await;
            state.last_notified_at = Some(now);

            match self.open_issue(key, &alert.title(), message).await {
                Ok(issue_id) => state.issue_id = issue_id.or(state.issue_id),
                Err(e) => warn!("Failed to sync issue for '{}': {}", key, e),
            }
            AlarmOutcome::Notified
        };

        state.updated_at = now;
        self.persist(&state).await;
        outcome
    }

    /// Record a success of `key`.
    pub async fn check_up(&self, key: &str, message: &str) -> AlarmOutcome {
        self.check_up_at(key, message, Utc::now()).await
    }

    pub async fn check_up_at(
        &self,
        key: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> AlarmOutcome {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let mut state = self.store.load(key).await;
        let previous = state.last_state;
        if previous == HealthState::Up {
            return AlarmOutcome::Unchanged;
        }

        info!("Alarm '{}' transitioned {} -> up", key, previous);
        state.last_state = HealthState::Up;
        state.consecutive_failures = 0;
        state.updated_at = now;

        let notify = previous == HealthState::Down || self.config.notify_initial_up;
        if notify {
            let alert = self.alert(key, AlertKind::Recovered, message, &state, now);
            self.notify(&alert).await;
            state.last_notified_at = Some(now);
        }

        // Unknown also closes: the stored state may have been lost while an issue is open.
        match self.close_issue(key, state.issue_id, message).await {
            Ok(()) => state.issue_id = None,
            Err(e) => warn!("Failed to close issue for '{}': {}", key, e),
        }

        self.persist(&state).await;
        if notify {
            AlarmOutcome::Recovered
        } else {
            AlarmOutcome::Unchanged
        }
    }

    /// Current state of a key.
    pub async fn state(&self, key: &str) -> AlarmState {
        self.store.load(key).await
    }

    /// All known alarm states.
    pub async fn states(&self) -> Result<Vec<AlarmState>, AlarmError> {
        self.store.list().await
    }

    /// Forget a key; its next observation starts from Unknown.
    pub async fn reset(&self, key: &str) -> Result<bool, AlarmError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        self.store.delete(key).await
    }

    fn alert(
        &self,
        key: &str,
        kind: AlertKind,
        message: &str,
        state: &AlarmState,
        now: DateTime<Utc>,
    ) -> Alert {
        let mut alert = Alert::new(key, kind, message)
            .with_timestamp(now)
            .with_failures(state.consecutive_failures);
        if let Some(ref host) = self.hostname {
            alert = alert.with_host(host.clone());
        }
        alert
    }

    async fn notify(&self, alert: &Alert) {
        let errors = self.alerts.send(alert).await;
        if !errors.is_empty() {
            warn!("{} alert channel(s) failed for '{}'", errors.len(), alert.title());
        }
    }

    /// Note on the open issue for `key`, or file a new one.
    async fn open_issue(
        &self,
        key: &str,
        subject: &str,
        message: &str,
    ) -> Result<Option<u64>, AlarmError> {
        let Some(tracker) = &self.tracker else {
            return Ok(None);
        };

        if let Some(issue) = tracker.find_open_issue(key).await? {
            tracker.add_note(issue.id, message).await?;
            debug!("Added note to {} issue #{} for '{}'", tracker.name(), issue.id, key);
            return Ok(Some(issue.id));
        }

        let issue = tracker.create_issue(key, subject, message).await?;
        info!("Opened {} issue #{} for '{}'", tracker.name(), issue.id, key);
        Ok(Some(issue.id))
    }

    async fn close_issue(
        &self,
        key: &str,
        known: Option<u64>,
        message: &str,
    ) -> Result<(), AlarmError> {
        let Some(tracker) = &self.tracker else {
            return Ok(());
        };

        let issue_id = match known {
            Some(id) => Some(id),
            None => tracker.find_open_issue(key).await?.map(|issue| issue.id),
        };
        if let Some(id) = issue_id {
            tracker.close_issue(id, message).await?;
            info!("Closed {} issue #{} for '{}'", tracker.name(), id, key);
        }
        Ok(())
    }

    async fn persist(&self, state: &AlarmState) {
        if let Err(e) = self.store.save(state).await {
            warn!("Failed to persist alarm state for '{}': {}", state.key, e);
        }
    }
}
