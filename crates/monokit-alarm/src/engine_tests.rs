use super::*;
use async_trait::async_trait;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use crate::alerts::AlertChannel;
use crate::tracker::IssueRef;
use monokit_store::{MemoryStore, StoreError, StoredValue};

#[derive(Default)]
struct Recorded {
    alerts: StdMutex<Vec<Alert>>,
}

impl Recorded {
    fn titles(&self) -> Vec<String> {
        self.alerts.lock().unwrap().iter().map(|a| a.title()).collect()
    }
}

struct RecordingChannel(Arc<Recorded>);

#[async_trait]
impl AlertChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlarmError> {
        self.0.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct FailingChannel;

#[async_trait]
impl AlertChannel for FailingChannel {
    fn name(&self) -> &str {
        "failing"
    }

    async fn send(&self, _alert: &Alert) -> Result<(), AlarmError> {
        Err(AlarmError::Notification("connection refused".to_string()))
    }
}

#[derive(Default)]
struct MockTracker {
    next_id: StdMutex<u64>,
    open: StdMutex<Vec<(String, u64)>>,
    created: StdMutex<Vec<String>>,
    notes: StdMutex<Vec<(u64, String)>>,
    closed: StdMutex<Vec<u64>>,
    fail: bool,
}

impl MockTracker {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn with_open_issue(service: &str, id: u64) -> Self {
        let tracker = Self::default();
        tracker.open.lock().unwrap().push((service.to_string(), id));
        tracker
    }

    fn check(&self) -> Result<(), AlarmError> {
        if self.fail {
            return Err(AlarmError::Tracker("tracker offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for MockTracker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn find_open_issue(&self, service: &str) -> Result<Option<IssueRef>, AlarmError> {
        self.check()?;
        Ok(self
            .open
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| s == service)
            .map(|(_, id)| IssueRef { id: *id, subject: String::new() }))
    }

    async fn create_issue(
        &self,
        service: &str,
        subject: &str,
        _description: &str,
    ) -> Result<IssueRef, AlarmError> {
        self.check()?;
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = 100 + *next;
        self.open.lock().unwrap().push((service.to_string(), id));
        self.created.lock().unwrap().push(service.to_string());
        Ok(IssueRef { id, subject: subject.to_string() })
    }

    async fn add_note(&self, issue_id: u64, note: &str) -> Result<(), AlarmError> {
        self.check()?;
        self.notes.lock().unwrap().push((issue_id, note.to_string()));
        Ok(())
    }

    async fn close_issue(&self, issue_id: u64, _note: &str) -> Result<(), AlarmError> {
        self.check()?;
        self.open.lock().unwrap().retain(|(_, id)| *id != issue_id);
        self.closed.lock().unwrap().push(issue_id);
        Ok(())
    }
}

/// Store whose reads fail but writes succeed.
struct UnreadableStore(MemoryStore);

#[async_trait]
impl KvStore for UnreadableStore {
    async fn get(&self, _namespace: &str, _key: &str) -> Result<Option<StoredValue>, StoreError> {
        Err(StoreError::Query("database is locked".to_string()))
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.0.put(namespace, key, value, ttl).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        self.0.delete(namespace, key).await
    }

    async fn list(&self, namespace: &str) -> Result<Vec<StoredValue>, StoreError> {
        self.0.list(namespace).await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.0.purge_expired().await
    }
}

struct Fixture {
    engine: AlarmEngine,
    recorded: Arc<Recorded>,
    tracker: Arc<MockTracker>,
    store: Arc<dyn KvStore>,
}

fn fixture_with(config: AlarmConfig, tracker: MockTracker) -> Fixture {
    let recorded = Arc::new(Recorded::default());
    let tracker = Arc::new(tracker);
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let engine = AlarmEngine::new(
        config,
        AlertManager::empty().with_channel(Box::new(RecordingChannel(recorded.clone()))),
        store.clone(),
    )
    .with_tracker(tracker.clone())
    .with_hostname("web01");
    Fixture {
        engine,
        recorded,
        tracker,
        store,
    }
}

fn fixture() -> Fixture {
    fixture_with(
        AlarmConfig::default().with_renotify_interval(Duration::from_secs(3600)),
        MockTracker::default(),
    )
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn mins(n: i64) -> chrono::Duration {
    chrono::Duration::minutes(n)
}

#[tokio::test]
async fn test_repeated_failures_notify_once() {
    let f = fixture();

    assert_eq!(
        f.engine.check_down_at("svc_x", "refused", false, t0()).await,
        AlarmOutcome::Notified
    );
    assert_eq!(
        f.engine.check_down_at("svc_x", "refused", false, t0() + mins(1)).await,
        AlarmOutcome::Suppressed
    );

    assert_eq!(f.recorded.titles(), vec!["svc_x is DOWN"]);
    assert_eq!(f.tracker.created.lock().unwrap().as_slice(), ["svc_x"]);

    let state = f.engine.state("svc_x").await;
    assert_eq!(state.last_state, HealthState::Down);
    assert_eq!(state.consecutive_failures, 2);
    assert_eq!(state.issue_id, Some(101));
    assert_eq!(state.last_notified_at, Some(t0()));
}

#[tokio::test]
async fn test_failure_then_recovery() {
    let f = fixture();

    f.engine.check_down_at("svc_y", "refused", false, t0()).await;
    assert_eq!(
        f.engine.check_up_at("svc_y", "accepting connections", t0() + mins(5)).await,
        AlarmOutcome::Recovered
    );

    assert_eq!(f.recorded.titles(), vec!["svc_y is DOWN", "svc_y is UP"]);
    assert_eq!(f.tracker.created.lock().unwrap().len(), 1);
    assert_eq!(f.tracker.closed.lock().unwrap().as_slice(), [101]);
    assert!(f.tracker.open.lock().unwrap().is_empty());

    let state = f.engine.state("svc_y").await;
    assert_eq!(state.last_state, HealthState::Up);
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.issue_id.is_none());
}

#[tokio::test]
async fn test_recovery_is_idempotent() {
    let f = fixture();

    f.engine.check_down_at("svc", "down", false, t0()).await;
    assert_eq!(f.engine.check_up_at("svc", "up", t0() + mins(1)).await, AlarmOutcome::Recovered);
    assert_eq!(f.engine.check_up_at("svc", "up", t0() + mins(2)).await, AlarmOutcome::Unchanged);
    assert_eq!(f.engine.check_up_at("svc", "up", t0() + mins(3)).await, AlarmOutcome::Unchanged);

    let ups = f.recorded.titles().iter().filter(|t| t.ends_with("UP")).count();
    assert_eq!(ups, 1);
    assert_eq!(f.tracker.closed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_suppression_window() {
    let f = fixture();

    f.engine.check_down_at("svc", "down", false, t0()).await;
    assert_eq!(
        f.engine.check_down_at("svc", "down", false, t0() + mins(59)).await,
        AlarmOutcome::Suppressed
    );
    assert_eq!(
        f.engine.check_down_at("svc", "down", false, t0() + mins(60)).await,
        AlarmOutcome::Renotified
    );
    assert_eq!(
        f.engine.check_down_at("svc", "down", false, t0() + mins(61)).await,
        AlarmOutcome::Suppressed
    );
    assert_eq!(
        f.engine.check_down_at("svc", "down", false, t0() + mins(120)).await,
        AlarmOutcome::Renotified
    );

    assert_eq!(
        f.recorded.titles(),
        vec!["svc is DOWN", "svc is still DOWN", "svc is still DOWN"]
    );
    // The tracker is only touched on the transition.
    assert_eq!(f.tracker.created.lock().unwrap().len(), 1);
    assert!(f.tracker.notes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_force_bypasses_suppression() {
    let f = fixture();

    f.engine.check_down_at("svc", "down", false, t0()).await;
    assert_eq!(
        f.engine.check_down_at("svc", "down", true, t0() + mins(1)).await,
        AlarmOutcome::Renotified
    );
    assert_eq!(f.recorded.titles().len(), 2);
}

#[tokio::test]
async fn test_existing_open_issue_gets_note() {
    let f = fixture_with(AlarmConfig::default(), MockTracker::with_open_issue("svc_x", 7));

    f.engine.check_down_at("svc_x", "refused again", false, t0()).await;

    assert!(f.tracker.created.lock().unwrap().is_empty());
    assert_eq!(
        f.tracker.notes.lock().unwrap().as_slice(),
        [(7, "refused again".to_string())]
    );
    assert_eq!(f.engine.state("svc_x").await.issue_id, Some(7));
}

#[tokio::test]
async fn test_initial_up_notifies_by_default() {
    let f = fixture();

    assert_eq!(f.engine.check_up_at("svc", "fine", t0()).await, AlarmOutcome::Recovered);
    assert_eq!(f.recorded.titles(), vec!["svc is UP"]);
    assert!(f.tracker.closed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_first_up_closes_issue_left_open() {
    let f = fixture_with(AlarmConfig::default(), MockTracker::with_open_issue("svc_y", 7));

    assert_eq!(f.engine.check_up_at("svc_y", "recovered", t0()).await, AlarmOutcome::Recovered);

    assert_eq!(f.tracker.closed.lock().unwrap().as_slice(), [7]);
    assert!(f.tracker.open.lock().unwrap().is_empty());
    assert!(f.engine.state("svc_y").await.issue_id.is_none());
}

#[tokio::test]
async fn test_unreadable_store_recovery_closes_issue() {
    let tracker = Arc::new(MockTracker::with_open_issue("svc", 9));
    let engine = AlarmEngine::new(
        AlarmConfig::default().with_notify_initial_up(false),
        AlertManager::empty(),
        Arc::new(UnreadableStore(MemoryStore::new())),
    )
    .with_tracker(tracker.clone());

    assert_eq!(engine.check_up_at("svc", "ok", t0()).await, AlarmOutcome::Unchanged);
    assert_eq!(tracker.closed.lock().unwrap().as_slice(), [9]);
}

#[tokio::test]
async fn test_initial_up_silent_when_disabled() {
    let config = AlarmConfig::default().with_notify_initial_up(false);
    let f = fixture_with(config, MockTracker::default());

    assert_eq!(f.engine.check_up_at("svc", "fine", t0()).await, AlarmOutcome::Unchanged);
    assert!(f.recorded.titles().is_empty());
    assert_eq!(f.engine.state("svc").await.last_state, HealthState::Up);
}

#[tokio::test]
async fn test_up_then_down_notifies() {
    let f = fixture();

    f.engine.check_up_at("svc", "fine", t0()).await;
    assert_eq!(
        f.engine.check_down_at("svc", "broken", false, t0() + mins(1)).await,
        AlarmOutcome::Notified
    );
}

#[tokio::test]
async fn test_tracker_failure_does_not_block_transition() {
    let f = fixture_with(AlarmConfig::default(), MockTracker::failing());

    assert_eq!(f.engine.check_down_at("svc", "down", false, t0()).await, AlarmOutcome::Notified);
    assert_eq!(f.engine.state("svc").await.last_state, HealthState::Down);
    assert_eq!(f.engine.check_up_at("svc", "up", t0() + mins(1)).await, AlarmOutcome::Recovered);
    assert_eq!(f.engine.state("svc").await.last_state, HealthState::Up);
}

#[tokio::test]
async fn test_channel_failure_does_not_block_transition() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let engine = AlarmEngine::new(
        AlarmConfig::default(),
        AlertManager::empty().with_channel(Box::new(FailingChannel)),
        store,
    );

    assert_eq!(engine.check_down_at("svc", "down", false, t0()).await, AlarmOutcome::Notified);
    let state = engine.state("svc").await;
    assert_eq!(state.last_state, HealthState::Down);
    assert_eq!(state.last_notified_at, Some(t0()));
}

#[tokio::test]
async fn test_state_survives_engine_restart() {
    let f = fixture();
    f.engine.check_down_at("svc", "down", false, t0()).await;

    let recorded = Arc::new(Recorded::default());
    let engine = AlarmEngine::new(
        AlarmConfig::default(),
        AlertManager::empty().with_channel(Box::new(RecordingChannel(recorded.clone()))),
        f.store.clone(),
    );

    assert_eq!(
        engine.check_down_at("svc", "down", false, t0() + mins(2)).await,
        AlarmOutcome::Suppressed
    );
    assert!(recorded.titles().is_empty());
}

#[tokio::test]
async fn test_unreadable_store_degrades_to_unknown() {
    let recorded = Arc::new(Recorded::default());
    let engine = AlarmEngine::new(
        AlarmConfig::default(),
        AlertManager::empty().with_channel(Box::new(RecordingChannel(recorded.clone()))),
        Arc::new(UnreadableStore(MemoryStore::new())),
    );

    assert_eq!(engine.check_down_at("svc", "down", false, t0()).await, AlarmOutcome::Notified);
    assert_eq!(
        engine.check_down_at("svc", "down", false, t0() + mins(1)).await,
        AlarmOutcome::Notified
    );
    assert_eq!(recorded.titles().len(), 2);
}

#[tokio::test]
async fn test_reset() {
    let f = fixture();
    f.engine.check_down_at("svc", "down", false, t0()).await;

    assert!(f.engine.reset("svc").await.unwrap());
    assert_eq!(f.engine.state("svc").await.last_state, HealthState::Unknown);
    assert!(f.engine.states().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_alert_carries_host_and_key() {
    let f = fixture();
    f.engine.check_down_at("osHealth_memory", "95% used", false, t0()).await;

    let alerts = f.recorded.alerts.lock().unwrap();
    assert_eq!(alerts[0].key, "osHealth_memory");
    assert_eq!(alerts[0].host.as_deref(), Some("web01"));
    assert_eq!(alerts[0].kind, AlertKind::Down);
    assert_eq!(alerts[0].consecutive_failures, 1);
    assert_eq!(alerts[0].timestamp, t0());
}

#[tokio::test]
async fn test_concurrent_failures_notify_once() {
    let f = Arc::new(fixture());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let f = f.clone();
            tokio::spawn(async move { f.engine.check_down("svc", "down", false).await })
        })
        .collect();

    let mut notified = 0;
    for handle in handles {
        if handle.await.unwrap() == AlarmOutcome::Notified {
            notified += 1;
        }
    }

    assert_eq!(notified, 1);
    assert_eq!(f.recorded.titles().len(), 1);
    assert_eq!(f.engine.state("svc").await.consecutive_failures, 8);
}
