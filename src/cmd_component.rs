//! Handlers for component and alarm subcommands.

use monokit_core::RegistryError;
use monokit_protocols::{ComponentError, InvokeContext};
use tracing::warn;

use crate::App;
use crate::cli::AlarmAction;

/// Run one component by name.
pub(crate) async fn run_component(
    app: &App,
    name: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let component = app
        .registry
        .get(name)
        .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

    if !component.platform().matches_current() {
        return Err(ComponentError::NotApplicable(name.to_string()).into());
    }
    if !component.is_enabled() {
        warn!("Component '{}' is disabled in config; running on explicit request", name);
    }
    if !component.is_detected() {
        warn!("Component '{}' was not detected on this host; running anyway", name);
    }

    let _lock = app.lock(name)?;

    let ctx = InvokeContext::new(app.hostname.clone()).with_structured(json);
    let entry_point = component.entry_point();
    let result = match tokio::spawn(async move { entry_point.invoke(&ctx).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ComponentError::Panicked(name.to_string())),
        Err(e) => Err(ComponentError::Custom(e.to_string())),
    };
    result?;
    Ok(())
}

/// Handle `monokit alarm`.
pub(crate) async fn handle_alarm_command(
    app: &App,
    action: AlarmAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AlarmAction::List => {
            let states = app.alarms.states().await?;
            if states.is_empty() {
                println!("No alarm state recorded.");
                return Ok(());
            }
            let width = states.iter().map(|s| s.key.len()).max().unwrap_or(3).max(3);
            println!(
                "{:<width$}  {:<7}  {:>8}  {:<25}  ISSUE",
                "KEY", "STATE", "FAILURES", "LAST NOTIFIED"
            );
            for state in states {
                println!(
                    "{:<width$}  {:<7}  {:>8}  {:<25}  {}",
                    state.key,
                    state.last_state.to_string(),
                    state.consecutive_failures,
                    state
                        .last_notified_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string()),
                    state
                        .issue_id
                        .map(|id| format!("#{}", id))
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            Ok(())
        }
        AlarmAction::Reset { key } => {
            if app.alarms.reset(&key).await? {
                println!("Reset alarm {}", key);
            } else {
                println!("No state recorded for {}", key);
            }
            Ok(())
        }
    }
}
