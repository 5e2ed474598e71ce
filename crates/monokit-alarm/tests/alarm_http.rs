//! End-to-end alarm flow against a mocked webhook and Redmine server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use monokit_alarm::{
    AlarmConfig, AlarmEngine, AlarmOutcome, AlertManager, HealthState, RedmineTracker,
    TrackerConfig, WebhookFormat,
};
use monokit_store::{KvStore, MemoryStore};
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

fn tracker_config(server: &MockServer) -> TrackerConfig {
    TrackerConfig {
        enabled: true,
        url: server.uri(),
        api_key: "k".to_string(),
        project_id: "infra".to_string(),
        service_field_id: 3,
        closed_status_id: 5,
        timeout_secs: 1,
    }
}

#[tokio::test]
async fn test_down_then_up_hits_webhook_and_tracker() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/hook"))
        .and(matchers::body_string_contains("svc_y is DOWN"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/hook"))
        .and(matchers::body_string_contains("svc_y is UP"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/issues.json"))
        .and(matchers::query_param("cf_3", "svc_y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"issues": []})))
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/issues.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "issue": {"id": 55, "subject": "svc_y is DOWN"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("PUT"))
        .and(matchers::path("/issues/55.json"))
        .and(matchers::body_partial_json(serde_json::json!({"issue": {"status_id": 5}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = AlarmConfig::default()
        .with_webhook(format!("{}/hook", server.uri()), WebhookFormat::Plain);
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let tracker = RedmineTracker::new(&tracker_config(&server)).unwrap();
    let engine = AlarmEngine::new(config.clone(), AlertManager::from_config(&config), store)
        .with_tracker(Arc::new(tracker));

    let down = engine.check_down("svc_y", "connection refused", false).await;
    assert_eq!(down, AlarmOutcome::Notified);
    let again = engine.check_down("svc_y", "connection refused", false).await;
    assert_eq!(again, AlarmOutcome::Suppressed);
    assert_eq!(engine.check_up("svc_y", "ok").await, AlarmOutcome::Recovered);

    assert!(engine.state("svc_y").await.issue_id.is_none());
}

#[tokio::test]
async fn test_webhook_outage_keeps_state() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = AlarmConfig::default()
        .with_webhook(format!("{}/hook", server.uri()), WebhookFormat::Slack);
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let engine = AlarmEngine::new(config.clone(), AlertManager::from_config(&config), store);

    assert_eq!(engine.check_down("svc", "down", false).await, AlarmOutcome::Notified);
    assert_eq!(engine.check_down("svc", "down", false).await, AlarmOutcome::Suppressed);
}

#[tokio::test]
async fn test_stalled_webhook_and_tracker_do_not_block_transition() {
    let server = MockServer::start().await;

    Mock::given(matchers::any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let config = AlarmConfig::default()
        .with_webhook(format!("{}/hook", server.uri()), WebhookFormat::Slack)
        .with_timeout(Duration::from_secs(1));
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let tracker = RedmineTracker::new(&tracker_config(&server)).unwrap();
    let engine = AlarmEngine::new(config.clone(), AlertManager::from_config(&config), store)
        .with_tracker(Arc::new(tracker));

    let started = Instant::now();
    assert_eq!(engine.check_down("svc", "down", false).await, AlarmOutcome::Notified);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(engine.state("svc").await.last_state, HealthState::Down);
}
