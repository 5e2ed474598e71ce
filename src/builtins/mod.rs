//! Components compiled into the binary.

use std::sync::Arc;

use monokit_alarm::AlarmEngine;
use monokit_config::Config;
use monokit_core::ComponentRegistry;

pub(crate) mod os_health;

/// Register every builtin supported on this platform.
#[allow(unused_variables)]
pub(crate) fn register_builtins(
    registry: &ComponentRegistry,
    config: &Config,
    alarms: &Arc<AlarmEngine>,
) {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        use monokit_protocols::{Component, ComponentSource, Platform};

        let provider = os_health::OsHealth::new(alarms.clone(), config.os_health.clone());
        let component = Component::from_provider(Arc::new(provider), ComponentSource::Builtin)
            .with_platform(Platform::current())
            .with_description("Disk usage per mount, memory usage and load average");
        registry.register(os_health_detect(component));
    }
}

/// Memory and load figures come from procfs on Linux; skip hosts without it.
#[cfg(target_os = "linux")]
fn os_health_detect(component: monokit_protocols::Component) -> monokit_protocols::Component {
    component.with_auto_detect(monokit_core::detect::requires_any_path(vec![
        "/proc/meminfo",
        "/proc/loadavg",
    ]))
}

#[cfg(target_os = "macos")]
fn os_health_detect(component: monokit_protocols::Component) -> monokit_protocols::Component {
    component
}
