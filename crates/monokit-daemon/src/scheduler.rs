//! Sequential batch scheduler.
//!
//! A batch runs every eligible component once, in registry order. Each
//! entry point runs in its own task so an `Err` or a panic is recorded as a
//! failure of that component and the batch moves on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use monokit_core::ComponentRegistry;
use monokit_protocols::{ComponentError, ComponentInfo, InvokeContext};

use crate::signal::SignalHandler;

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

/// Outcome of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Components that completed successfully.
    pub succeeded: Vec<String>,
    /// Components that returned an error or panicked, with the reason.
    pub failed: Vec<(String, String)>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn ran(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Passed to the cycle hook after each batch.
#[derive(Debug, Clone, Copy)]
pub struct CycleContext {
    /// 1-based batch number.
    pub cycle: u64,
    /// A reload (SIGHUP) was requested since the previous batch.
    pub reload_requested: bool,
}

/// Runs between batches of `run_forever`.
#[async_trait]
pub trait CycleHook: Send + Sync {
    async fn after_cycle(&self, ctx: CycleContext, report: &BatchReport);
}

pub struct Scheduler {
    registry: Arc<ComponentRegistry>,
    context: InvokeContext,
    hook: Option<Arc<dyn CycleHook>>,
}

impl Scheduler {
    pub fn new(registry: Arc<ComponentRegistry>, hostname: impl Into<String>) -> Self {
        Self {
            registry,
            context: InvokeContext::new(hostname),
            hook: None,
        }
    }

    /// Ask providers for structured output instead of text reports.
    pub fn with_structured(mut self, structured: bool) -> Self {
        self.context = self.context.with_structured(structured);
        self
    }

    pub fn with_cycle_hook(mut self, hook: Arc<dyn CycleHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Snapshot of every registered component.
    pub fn list_components(&self) -> Vec<ComponentInfo> {
        self.registry.infos()
    }

    /// Run every eligible component once.
    pub async fn run_once(&self) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();

        let components = self.registry.eligible();
        debug!("Running batch of {} component(s)", components.len());

        for component in components {
            let name = component.name().to_string();
            let entry_point = component.entry_point();
            let ctx = self.context.clone();

            let handle = tokio::spawn(async move { entry_point.invoke(&ctx).await });

            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(ComponentError::Panicked(name.clone())),
                Err(e) => Err(ComponentError::Custom(format!("task aborted: {}", e))),
            };

            match result {
                Ok(()) => {
                    debug!("Component '{}' completed", name);
                    report.succeeded.push(name);
                }
                Err(e) => {
                    error!("Component '{}' failed: {}", name, e);
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "Batch finished: {} ok, {} failed in {:?}",
            report.succeeded.len(),
            report.failed.len(),
            report.elapsed
        );
        report
    }

    /// Run batches every `interval` until shutdown is requested.
    ///
    /// Returns the number of completed batches.
    pub async fn run_forever(&self, interval: Duration, signals: &SignalHandler) -> u64 {
        let mut cycle = 0u64;
        info!("Scheduler started (interval {:?})", interval);

        while !signals.is_shutdown_requested() {
            let report = self.run_once().await;
            cycle += 1;

            if signals.is_shutdown_requested() {
                break;
            }

            let reload_requested = signals.take_reload();
            if let Some(ref hook) = self.hook {
                hook.after_cycle(
                    CycleContext {
                        cycle,
                        reload_requested,
                    },
                    &report,
                )
                .await;
            } else if reload_requested {
                warn!("Reload requested but no cycle hook is installed");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = signals.wait_for_shutdown() => break,
            }
        }

        info!("Scheduler stopped after {} batch(es)", cycle);
        cycle
    }
}
