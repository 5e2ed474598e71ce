//! Adapter types and utility functions for Monokit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use monokit_config::monokit_home;
use monokit_core::{ActionThrottle, ThrottlePolicy};
use monokit_daemon::{BatchReport, CycleContext, CycleHook};
use monokit_plugin_host::PluginHost;
use monokit_store::{CachedEntry, KvStore, ResultCache, StoreError};

/// Minimum spacing between signal-triggered plugin reloads.
const RELOAD_MIN_INTERVAL: Duration = Duration::from_secs(30);

/// How long a recorded batch stays visible to `monokit components`.
const LAST_BATCH_TTL: Duration = Duration::from_secs(24 * 3600);

const LAST_BATCH_KEY: &str = "last_batch";

/// Directory for rolling log files.
pub(crate) fn log_dir() -> PathBuf {
    monokit_home().join("logs")
}

/// Per-component outcome of the most recent daemon batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct LastBatch {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl LastBatch {
    /// Short status for one component: `ok`, `failed` or `-` when it did not run.
    pub(crate) fn status(&self, name: &str) -> &'static str {
        if self.succeeded.iter().any(|n| n == name) {
            "ok"
        } else if self.failed.iter().any(|(n, _)| n == name) {
            "failed"
        } else {
            "-"
        }
    }
}

impl From<&BatchReport> for LastBatch {
    fn from(report: &BatchReport) -> Self {
        Self {
            succeeded: report.succeeded.clone(),
            failed: report.failed.clone(),
        }
    }
}

/// Remembers the last batch in the state store.
#[derive(Clone)]
pub(crate) struct BatchHistory {
    cache: ResultCache,
}

impl BatchHistory {
    pub(crate) fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            cache: ResultCache::new(store, "daemon", LAST_BATCH_TTL),
        }
    }

    pub(crate) async fn record(&self, report: &BatchReport) -> Result<(), StoreError> {
        self.cache.put(LAST_BATCH_KEY, &LastBatch::from(report)).await
    }

    pub(crate) async fn last(&self) -> Result<Option<CachedEntry<LastBatch>>, StoreError> {
        self.cache.get(LAST_BATCH_KEY).await
    }
}

/// Adapter: records each batch and restarts plugin processes between batches.
///
/// Plugins restart after every batch when `every_cycle` is set, otherwise
/// on SIGHUP at most once per [`RELOAD_MIN_INTERVAL`].
pub(crate) struct DaemonCycleHook {
    host: Arc<PluginHost>,
    dir: PathBuf,
    every_cycle: bool,
    history: BatchHistory,
    reload_throttle: ActionThrottle,
}

impl DaemonCycleHook {
    pub(crate) fn new(
        host: Arc<PluginHost>,
        dir: PathBuf,
        every_cycle: bool,
        history: BatchHistory,
    ) -> Self {
        Self {
            host,
            dir,
            every_cycle,
            history,
            reload_throttle: ActionThrottle::new(ThrottlePolicy::interval(RELOAD_MIN_INTERVAL)),
        }
    }

    fn should_reload(&self, ctx: &CycleContext) -> bool {
        if self.every_cycle {
            return true;
        }
        if !ctx.reload_requested {
            return false;
        }
        let decision = self.reload_throttle.try_acquire("plugins");
        if !decision.is_allowed() {
            warn!("Ignoring plugin reload request: {:?}", decision);
        }
        decision.is_allowed()
    }
}

#[async_trait]
impl CycleHook for DaemonCycleHook {
    async fn after_cycle(&self, ctx: CycleContext, report: &BatchReport) {
        if let Err(e) = self.history.record(report).await {
            debug!("Cannot record batch {}: {}", ctx.cycle, e);
        }

        if !self.should_reload(&ctx) {
            return;
        }

        info!("Restarting plugins after batch {}", ctx.cycle);
        match self.host.reload(&self.dir).await {
            Ok(report) => {
                for (path, reason) in &report.failed {
                    warn!("Plugin {} failed to reload: {}", path.display(), reason);
                }
            }
            Err(e) => warn!("Plugin reload failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monokit_core::ComponentRegistry;
    use monokit_plugin_host::PluginHostConfig;
    use monokit_store::MemoryStore;

    fn report(succeeded: &[&str], failed: &[&str]) -> BatchReport {
        BatchReport {
            succeeded: succeeded.iter().map(|s| s.to_string()).collect(),
            failed: failed.iter().map(|s| (s.to_string(), "boom".to_string())).collect(),
            elapsed: Duration::ZERO,
        }
    }

    fn hook(every_cycle: bool, dir: PathBuf) -> (DaemonCycleHook, BatchHistory) {
        let history = BatchHistory::new(Arc::new(MemoryStore::new()));
        let host = Arc::new(PluginHost::new(
            PluginHostConfig::default(),
            Arc::new(ComponentRegistry::new()),
        ));
        (DaemonCycleHook::new(host, dir, every_cycle, history.clone()), history)
    }

    fn ctx(cycle: u64, reload_requested: bool) -> CycleContext {
        CycleContext {
            cycle,
            reload_requested,
        }
    }

    #[test]
    fn test_last_batch_status() {
        let last = LastBatch::from(&report(&["osHealth"], &["k8sHealth"]));
        assert_eq!(last.status("osHealth"), "ok");
        assert_eq!(last.status("k8sHealth"), "failed");
        assert_eq!(last.status("redisHealth"), "-");
    }

    #[tokio::test]
    async fn test_history_keeps_latest_batch() {
        let history = BatchHistory::new(Arc::new(MemoryStore::new()));
        assert!(history.last().await.unwrap().is_none());

        history.record(&report(&["osHealth"], &["k8sHealth"])).await.unwrap();
        history.record(&report(&["osHealth", "k8sHealth"], &[])).await.unwrap();

        let last = history.last().await.unwrap().unwrap().value;
        assert_eq!(last.succeeded, vec!["osHealth", "k8sHealth"]);
        assert!(last.failed.is_empty());
    }

    #[tokio::test]
    async fn test_hook_records_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (hook, history) = hook(false, dir.path().to_path_buf());

        hook.after_cycle(ctx(1, false), &report(&["osHealth"], &[])).await;

        let last = history.last().await.unwrap().unwrap().value;
        assert_eq!(last.status("osHealth"), "ok");
    }

    #[test]
    fn test_signal_reloads_are_throttled() {
        let dir = tempfile::tempdir().unwrap();
        let (hook, _) = hook(false, dir.path().to_path_buf());

        assert!(!hook.should_reload(&ctx(1, false)));
        assert!(hook.should_reload(&ctx(2, true)));
        assert!(!hook.should_reload(&ctx(3, true)));
    }

    #[test]
    fn test_every_cycle_ignores_throttle() {
        let dir = tempfile::tempdir().unwrap();
        let (hook, _) = hook(true, dir.path().to_path_buf());

        assert!(hook.should_reload(&ctx(1, false)));
        assert!(hook.should_reload(&ctx(2, true)));
        assert!(hook.should_reload(&ctx(3, true)));
    }
}
