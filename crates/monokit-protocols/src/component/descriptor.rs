//! Component descriptor stored in the registry.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{EntryPoint, Platform, ProviderEntryPoint};
use crate::provider::Provider;

/// Runtime predicate deciding whether a component applies to this host.
pub type AutoDetect = Arc<dyn Fn() -> bool + Send + Sync>;

/// Where a component came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentSource {
    Builtin,
    Plugin,
}

impl fmt::Display for ComponentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSource::Builtin => write!(f, "builtin"),
            ComponentSource::Plugin => write!(f, "plugin"),
        }
    }
}

/// A registry entry pairing an entry point with scheduling metadata.
pub struct Component {
    name: String,
    description: String,
    entry_point: Arc<dyn EntryPoint>,
    platform: Platform,
    auto_detect: Option<AutoDetect>,
    source: ComponentSource,
    enabled: AtomicBool,
}

impl Component {
    /// Create an enabled builtin component available on every platform.
    pub fn new(name: impl Into<String>, entry_point: Arc<dyn EntryPoint>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            entry_point,
            platform: Platform::Any,
            auto_detect: None,
            source: ComponentSource::Builtin,
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a component whose entry point runs `provider` and prints its report.
    pub fn from_provider(provider: Arc<dyn Provider>, source: ComponentSource) -> Self {
        let name = provider.name().to_string();
        Self::new(name, Arc::new(ProviderEntryPoint::new(provider))).with_source(source)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_auto_detect<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.auto_detect = Some(Arc::new(predicate));
        self
    }

    pub fn with_source(mut self, source: ComponentSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        self.enabled.store(enabled, Ordering::SeqCst);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn source(&self) -> ComponentSource {
        self.source
    }

    pub fn entry_point(&self) -> Arc<dyn EntryPoint> {
        self.entry_point.clone()
    }

    pub fn has_auto_detect(&self) -> bool {
        self.auto_detect.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Evaluate the auto-detect predicate. Components without one always apply.
    ///
    /// A predicate that panics counts as not detected.
    pub fn is_detected(&self) -> bool {
        let Some(detect) = self.auto_detect.as_ref() else {
            return true;
        };
        match catch_unwind(AssertUnwindSafe(|| detect())) {
            Ok(detected) => detected,
            Err(_) => {
                warn!("Auto-detect for '{}' panicked, treating as not detected", self.name);
                false
            }
        }
    }

    /// Enabled, platform-matching and detected on this host.
    pub fn is_eligible(&self) -> bool {
        self.is_enabled() && self.platform.matches_current() && self.is_detected()
    }

    /// Snapshot for operator listings.
    pub fn info(&self) -> ComponentInfo {
        let enabled = self.is_enabled();
        let platform_ok = self.platform.matches_current();
        let detected = platform_ok && self.is_detected();
        ComponentInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            source: self.source,
            platform: self.platform,
            enabled,
            detected,
            eligible: enabled && detected,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("platform", &self.platform)
            .field("auto_detect", &self.auto_detect.is_some())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Read-only view of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub description: String,
    pub source: ComponentSource,
    pub platform: Platform,
    pub enabled: bool,
    pub detected: bool,
    pub eligible: bool,
}
