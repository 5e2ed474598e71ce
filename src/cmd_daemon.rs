//! Daemon subcommand handler.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use monokit_daemon::Scheduler;
use monokit_protocols::ComponentInfo;
use monokit_store::CachedEntry;

use crate::App;
use crate::adapters::{BatchHistory, DaemonCycleHook, LastBatch};

/// Handle `monokit daemon`.
pub(crate) async fn handle_daemon_command(
    app: &App,
    once: bool,
    list_components: bool,
    interval: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    if list_components {
        return show_components(app).await;
    }

    let _lock = app.lock("daemon")?;

    let history = BatchHistory::new(app.store.clone());
    let hook = DaemonCycleHook::new(
        app.host.clone(),
        app.plugin_dir.clone(),
        app.global.cleanup_plugins,
        history.clone(),
    );
    let scheduler = Scheduler::new(app.registry.clone(), app.hostname.clone())
        .with_cycle_hook(Arc::new(hook));

    if once {
        let report = scheduler.run_once().await;
        if let Err(e) = history.record(&report).await {
            debug!("Cannot record batch: {}", e);
        }
        for (name, reason) in &report.failed {
            warn!("{} failed: {}", name, reason);
        }
        println!(
            "Ran {} component(s): {} ok, {} failed",
            report.ran(),
            report.succeeded.len(),
            report.failed.len()
        );
        return Ok(());
    }

    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| app.config.daemon.interval());
    if interval.is_zero() {
        return Err("daemon interval must be greater than 0".into());
    }

    info!("Monokit daemon running on {} (PID {})", app.hostname, std::process::id());
    scheduler.run_forever(interval, &app.signals).await;
    Ok(())
}

/// Print the component catalog with the outcome of the last recorded batch.
pub(crate) async fn show_components(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    let last = match BatchHistory::new(app.store.clone()).last().await {
        Ok(last) => last,
        Err(e) => {
            debug!("No batch history: {}", e);
            None
        }
    };
    print_components(&app.registry.infos(), last.as_ref());
    Ok(())
}

/// Print the component catalog as a table.
pub(crate) fn print_components(
    components: &[ComponentInfo],
    last: Option<&CachedEntry<LastBatch>>,
) {
    if components.is_empty() {
        println!("No components registered.");
        return;
    }

    let width = components.iter().map(|c| c.name.len()).max().unwrap_or(4).max(4);
    println!(
        "{:<width$}  {:<7}  {:<7}  {:<8}  {:<8}  DESCRIPTION",
        "NAME", "SOURCE", "ENABLED", "ELIGIBLE", "LAST RUN"
    );
    for c in components {
        let status = last.map(|entry| entry.value.status(&c.name)).unwrap_or("-");
        println!(
            "{:<width$}  {:<7}  {:<7}  {:<8}  {:<8}  {}",
            c.name,
            c.source.to_string(),
            yes_no(c.enabled),
            yes_no(c.eligible),
            status,
            c.description
        );
    }
    if let Some(entry) = last {
        println!();
        println!("Last batch recorded at {}", entry.cached_at);
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
