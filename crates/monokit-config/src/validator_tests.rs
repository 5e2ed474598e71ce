use super::*;

fn enabled_tracker(config: &mut Config) {
    config.tracker.enabled = true;
    config.tracker.url = "https://redmine.example.com".to_string();
    config.tracker.api_key = "k".to_string();
    config.tracker.project_id = "infra".to_string();
    config.tracker.service_field_id = 3;
}

#[test]
fn test_validate_default_config() {
    let result = ConfigValidator::validate(&Config::default());
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_zero_interval() {
    let mut config = Config::default();
    config.daemon.interval_secs = 0;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "daemon.interval_secs"));
}

#[test]
fn test_validate_zero_plugin_timeouts() {
    let mut config = Config::default();
    config.plugins.call_timeout_secs = 0;
    config.plugins.shutdown_timeout_secs = 0;

    let result = ConfigValidator::validate(&config);
    assert_eq!(result.errors.len(), 2);
}

#[test]
fn test_validate_zero_http_timeouts() {
    let mut config = Config::default();
    config.alarm.timeout_secs = 0;
    config.tracker.timeout_secs = 0;

    // The tracker timeout only matters once the tracker is enabled.
    let result = ConfigValidator::validate(&config);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, "alarm.timeout_secs");
}

#[test]
fn test_validate_zero_renotify_is_warning() {
    let mut config = Config::default();
    config.alarm.renotify_interval_secs = 0;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "alarm.renotify_interval_secs"));
}

#[test]
fn test_validate_malformed_webhook() {
    let mut config = Config::default();
    config.alarm.webhook_url = Some("not a url".to_string());

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "alarm.webhook_url"));
}

#[test]
fn test_validate_webhook_scheme() {
    let mut config = Config::default();
    config.alarm.webhook_url = Some("ftp://hooks.example.com/x".to_string());

    let result = ConfigValidator::validate(&config);
    assert!(result.errors[0].message.contains("ftp"));
}

#[test]
fn test_validate_empty_webhook_ignored() {
    let mut config = Config::default();
    config.alarm.webhook_url = Some(String::new());

    assert!(ConfigValidator::validate(&config).is_valid());
}

#[test]
fn test_validate_disabled_tracker_ignored() {
    let mut config = Config::default();
    config.tracker.url = "garbage".to_string();

    assert!(ConfigValidator::validate(&config).is_valid());
}

#[test]
fn test_validate_enabled_tracker() {
    let mut config = Config::default();
    enabled_tracker(&mut config);

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_tracker_missing_fields() {
    let mut config = Config::default();
    config.tracker.enabled = true;
    config.tracker.url = "https://redmine.example.com".to_string();

    let result = ConfigValidator::validate(&config);
    let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["tracker.project_id", "tracker.service_field_id"]);
    assert!(result.warnings.iter().any(|w| w.path == "tracker.api_key"));
}

#[test]
fn test_validate_os_health_thresholds() {
    let mut config = Config::default();
    config.os_health.disk_percent = 150.0;
    config.os_health.load_per_cpu = 0.0;

    let result = ConfigValidator::validate(&config);
    assert_eq!(result.errors.len(), 2);
}

#[test]
fn test_into_error() {
    let mut config = Config::default();
    config.daemon.interval_secs = 0;

    let err = ConfigValidator::validate(&config).into_error().unwrap();
    assert!(err.to_string().contains("daemon.interval_secs"));
    assert!(ValidationResult::default().into_error().is_none());
}
