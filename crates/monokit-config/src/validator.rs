//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a `ConfigError`, if any.
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next().map(|e| ConfigError::InvalidValue {
            field: e.path,
            message: e.message,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_daemon(config, &mut result);
        Self::validate_plugins(config, &mut result);
        Self::validate_alarm(config, &mut result);
        Self::validate_tracker(config, &mut result);
        Self::validate_os_health(config, &mut result);

        result
    }

    fn validate_daemon(config: &Config, result: &mut ValidationResult) {
        if config.daemon.interval_secs == 0 {
            result.add_error(ValidationError::new(
                "daemon.interval_secs",
                "interval_secs must be greater than 0",
            ));
        }
    }

    fn validate_plugins(config: &Config, result: &mut ValidationResult) {
        let timeouts = [
            ("plugins.handshake_timeout_secs", config.plugins.handshake_timeout_secs),
            ("plugins.call_timeout_secs", config.plugins.call_timeout_secs),
            ("plugins.shutdown_timeout_secs", config.plugins.shutdown_timeout_secs),
        ];
        for (path, secs) in timeouts {
            if secs == 0 {
                result.add_error(ValidationError::new(path, "timeout must be greater than 0"));
            }
        }
    }

    fn validate_alarm(config: &Config, result: &mut ValidationResult) {
        if config.alarm.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "alarm.timeout_secs",
                "timeout must be greater than 0",
            ));
        }

        if config.alarm.renotify_interval_secs == 0 {
            result.add_warning(ValidationWarning::new(
                "alarm.renotify_interval_secs",
                "renotify interval is 0, every failed check will notify",
            ));
        }

        if let Some(ref webhook) = config.alarm.webhook_url {
            if !webhook.is_empty() {
                Self::check_http_url("alarm.webhook_url", webhook, result);
            }
        }
    }

    fn validate_tracker(config: &Config, result: &mut ValidationResult) {
        let tracker = &config.tracker;
        if !tracker.enabled {
            return;
        }

        Self::check_http_url("tracker.url", &tracker.url, result);
        if tracker.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "tracker.timeout_secs",
                "timeout must be greater than 0",
            ));
        }

        if tracker.project_id.is_empty() {
            result.add_error(ValidationError::new(
                "tracker.project_id",
                "project_id is required when the tracker is enabled",
            ));
        }

        if tracker.service_field_id == 0 {
            result.add_error(ValidationError::new(
                "tracker.service_field_id",
                "service_field_id is required when the tracker is enabled",
            ));
        }

        if tracker.api_key.is_empty() {
            result.add_warning(ValidationWarning::new(
                "tracker.api_key",
                "API key is not set, tracker requests will be anonymous",
            ));
        }
    }

    fn validate_os_health(config: &Config, result: &mut ValidationResult) {
        let os = &config.os_health;
        for (path, value) in [
            ("os_health.disk_percent", os.disk_percent),
            ("os_health.memory_percent", os.memory_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                result.add_error(ValidationError::new(path, "must be between 0 and 100"));
            }
        }

        if os.load_per_cpu <= 0.0 {
            result.add_error(ValidationError::new(
                "os_health.load_per_cpu",
                "load_per_cpu must be positive",
            ));
        }
    }

    fn check_http_url(path: &str, value: &str, result: &mut ValidationResult) {
        match url::Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => result.add_error(ValidationError::new(
                path,
                format!("unsupported URL scheme '{}'", url.scheme()),
            )),
            Err(e) => result.add_error(ValidationError::new(path, format!("invalid URL: {}", e))),
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
