use super::*;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

fn tracker(server: &MockServer) -> RedmineTracker {
    RedmineTracker::new(&TrackerConfig {
        enabled: true,
        url: format!("{}/", server.uri()),
        api_key: "secret".to_string(),
        project_id: "ops".to_string(),
        service_field_id: 7,
        closed_status_id: 5,
        timeout_secs: 1,
    })
    .unwrap()
}

#[tokio::test]
async fn test_find_open_issue() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/issues.json"))
        .and(matchers::header("X-Redmine-API-Key", "secret"))
        .and(matchers::query_param("project_id", "ops"))
        .and(matchers::query_param("status_id", "open"))
        .and(matchers::query_param("cf_7", "svc_x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issues": [{"id": 42, "subject": "svc_x is DOWN"}],
            "total_count": 1
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let issue = tracker(&mock_server).find_open_issue("svc_x").await.unwrap();
    assert_eq!(issue, Some(IssueRef { id: 42, subject: "svc_x is DOWN".to_string() }));
}

#[tokio::test]
async fn test_find_open_issue_none() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"issues": []})))
        .mount(&mock_server)
        .await;

    assert!(tracker(&mock_server).find_open_issue("svc_x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_issue() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/issues.json"))
        .and(matchers::body_partial_json(serde_json::json!({
            "issue": {
                "project_id": "ops",
                "subject": "svc_x is DOWN",
                "custom_fields": [{"id": 7, "value": "svc_x"}]
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "issue": {"id": 43, "subject": "svc_x is DOWN"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let issue = tracker(&mock_server)
        .create_issue("svc_x", "svc_x is DOWN", "refused")
        .await
        .unwrap();
    assert_eq!(issue.id, 43);
}

#[tokio::test]
async fn test_add_note_and_close() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("PUT"))
        .and(matchers::path("/issues/43.json"))
        .and(matchers::body_partial_json(serde_json::json!({"issue": {"notes": "still down"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(matchers::method("PUT"))
        .and(matchers::path("/issues/43.json"))
        .and(matchers::body_partial_json(serde_json::json!({"issue": {"status_id": 5}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let tracker = tracker(&mock_server);
    tracker.add_note(43, "still down").await.unwrap();
    tracker.close_issue(43, "recovered").await.unwrap();
}

#[tokio::test]
async fn test_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&mock_server)
        .await;

    let err = tracker(&mock_server).find_open_issue("svc_x").await.unwrap_err();
    assert!(matches!(err, AlarmError::Tracker(msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_unresponsive_tracker_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"issues": []}))
                .set_delay(std::time::Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let started = std::time::Instant::now();
    let err = tracker(&mock_server).find_open_issue("svc_x").await.unwrap_err();

    assert!(matches!(err, AlarmError::Tracker(_)));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}
