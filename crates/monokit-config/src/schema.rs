//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use monokit_alarm::{AlarmConfig, TrackerConfig};
use serde::{Deserialize, Serialize};

use crate::loader::{ConfigLoader, monokit_home};

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub alarm: AlarmConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub components: ComponentsConfig,

    #[serde(default)]
    pub os_health: OsHealthConfig,
}

/// Daemon loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between batches.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Directory for per-command lock files.
    #[serde(default)]
    pub lock_dir: Option<String>,
}

fn default_interval() -> u64 {
    60
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            lock_dir: None,
        }
    }
}

impl DaemonConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn lock_dir(&self) -> PathBuf {
        resolve(self.lock_dir.as_deref(), "run")
    }
}

/// Plugin host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Directory scanned for plugin executables.
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_handshake_timeout() -> u64 {
    10
}

fn default_call_timeout() -> u64 {
    300
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            handshake_timeout_secs: default_handshake_timeout(),
            call_timeout_secs: default_call_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl PluginsConfig {
    pub fn dir(&self) -> PathBuf {
        resolve(self.dir.as_deref(), "plugins")
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// State store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path.
    #[serde(default)]
    pub path: Option<String>,
}

impl StoreConfig {
    pub fn path(&self) -> PathBuf {
        resolve(self.path.as_deref(), "monokit.db")
    }
}

/// Component enable/disable overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentsConfig {
    /// Components registered but never scheduled.
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Thresholds for the builtin host health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsHealthConfig {
    /// Disk usage percentage per mount that raises an alarm.
    #[serde(default = "default_disk_percent")]
    pub disk_percent: f64,

    #[serde(default = "default_memory_percent")]
    pub memory_percent: f64,

    /// One-minute load average divided by CPU count.
    #[serde(default = "default_load_per_cpu")]
    pub load_per_cpu: f64,

    /// Mount points that are never checked.
    #[serde(default)]
    pub ignore_mounts: Vec<String>,
}

fn default_disk_percent() -> f64 {
    90.0
}

fn default_memory_percent() -> f64 {
    90.0
}

fn default_load_per_cpu() -> f64 {
    2.0
}

impl Default for OsHealthConfig {
    fn default() -> Self {
        Self {
            disk_percent: default_disk_percent(),
            memory_percent: default_memory_percent(),
            load_per_cpu: default_load_per_cpu(),
            ignore_mounts: Vec::new(),
        }
    }
}

/// Configured path with `~` expanded, or `<monokit home>/<default>`.
fn resolve(configured: Option<&str>, default: &str) -> PathBuf {
    match configured {
        Some(path) if !path.is_empty() => PathBuf::from(ConfigLoader::expand_path(path)),
        _ => monokit_home().join(default),
    }
}
