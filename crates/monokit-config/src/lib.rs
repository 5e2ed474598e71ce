//! # Monokit Config
//!
//! TOML configuration for the Monokit agent.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::{CONFIG_ENV, ConfigLoader, monokit_home};
pub use monokit_alarm::{AlarmConfig, TrackerConfig, WebhookFormat};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
