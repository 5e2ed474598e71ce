//! Builtin host health check: disk usage per mount, memory usage and load.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sysinfo::{Disks, System};
use tracing::debug;

use monokit_alarm::AlarmEngine;
use monokit_config::OsHealthConfig;
use monokit_protocols::{Provider, ProviderError, ProviderResult};

pub(crate) const NAME: &str = "osHealth";

/// Usage of one mounted filesystem.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DiskUsage {
    pub mount: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub percent: f64,
}

/// Point-in-time host measurements.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Snapshot {
    pub disks: Vec<DiskUsage>,
    pub memory_percent: f64,
    pub load_one: f64,
    pub cpus: usize,
}

/// One alarm-relevant observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Finding {
    pub key: String,
    pub healthy: bool,
    pub message: String,
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

fn collect_snapshot() -> Snapshot {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu();

    let disks = Disks::new_with_refreshed_list();
    let mut usage: Vec<DiskUsage> = Vec::new();
    for disk in &disks {
        let total_bytes = disk.total_space();
        if total_bytes == 0 {
            continue;
        }
        let mount = disk.mount_point().to_string_lossy().to_string();
        if usage.iter().any(|d| d.mount == mount) {
            continue;
        }
        let used_bytes = total_bytes.saturating_sub(disk.available_space());
        usage.push(DiskUsage {
            mount,
            total_bytes,
            used_bytes,
            percent: percent(used_bytes, total_bytes),
        });
    }
    usage.sort_by(|a, b| a.mount.cmp(&b.mount));

    Snapshot {
        disks: usage,
        memory_percent: percent(sys.used_memory(), sys.total_memory()),
        load_one: System::load_average().one,
        cpus: sys.cpus().len().max(1),
    }
}

/// `osHealth_disk_<mount>` with path separators folded to underscores.
pub(crate) fn disk_key(mount: &str) -> String {
    let trimmed = mount.trim_matches('/');
    let suffix = if trimmed.is_empty() {
        "root".to_string()
    } else {
        trimmed
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    };
    format!("{}_disk_{}", NAME, suffix)
}

/// Compare a snapshot against thresholds.
pub(crate) fn evaluate(snapshot: &Snapshot, thresholds: &OsHealthConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for disk in &snapshot.disks {
        if thresholds.ignore_mounts.iter().any(|m| m == &disk.mount) {
            continue;
        }
        findings.push(Finding {
            key: disk_key(&disk.mount),
            healthy: disk.percent < thresholds.disk_percent,
            message: format!(
                "Disk {} is {:.1}% full (threshold {:.0}%)",
                disk.mount, disk.percent, thresholds.disk_percent
            ),
        });
    }

    findings.push(Finding {
        key: format!("{}_memory", NAME),
        healthy: snapshot.memory_percent < thresholds.memory_percent,
        message: format!(
            "Memory usage is {:.1}% (threshold {:.0}%)",
            snapshot.memory_percent, thresholds.memory_percent
        ),
    });

    let limit = thresholds.load_per_cpu * snapshot.cpus as f64;
    findings.push(Finding {
        key: format!("{}_load", NAME),
        healthy: snapshot.load_one < limit,
        message: format!(
            "Load average is {:.2} on {} CPU(s) (threshold {:.2})",
            snapshot.load_one, snapshot.cpus, limit
        ),
    });

    findings
}

fn render(hostname: &str, findings: &[Finding]) -> String {
    let mut out = format!("{} report for {}\n", NAME, hostname);
    for finding in findings {
        let mark = if finding.healthy { "OK  " } else { "FAIL" };
        out.push_str(&format!("  [{}] {}\n", mark, finding.message));
    }
    out
}

pub(crate) struct OsHealth {
    alarms: Arc<AlarmEngine>,
    thresholds: OsHealthConfig,
}

impl OsHealth {
    pub(crate) fn new(alarms: Arc<AlarmEngine>, thresholds: OsHealthConfig) -> Self {
        Self { alarms, thresholds }
    }

    async fn check(&self) -> Result<(Snapshot, Vec<Finding>), ProviderError> {
        let snapshot = tokio::task::spawn_blocking(collect_snapshot)
            .await
            .map_err(|e| ProviderError::CallFailed(format!("host snapshot failed: {}", e)))?;
        let findings = evaluate(&snapshot, &self.thresholds);

        for finding in &findings {
            let outcome = if finding.healthy {
                self.alarms.check_up(&finding.key, &finding.message).await
            } else {
                self.alarms.check_down(&finding.key, &finding.message, false).await
            };
            debug!("{}: {:?}", finding.key, outcome);
        }

        Ok((snapshot, findings))
    }
}

#[async_trait]
impl Provider for OsHealth {
    fn name(&self) -> &str {
        NAME
    }

    async fn collect(&self, hostname: &str) -> Result<ProviderResult, ProviderError> {
        let (_, findings) = self.check().await?;
        Ok(ProviderResult::text(render(hostname, &findings)))
    }

    async fn collect_structured(&self, hostname: &str) -> Result<serde_json::Value, ProviderError> {
        let (snapshot, findings) = self.check().await?;
        Ok(serde_json::json!({
            "hostname": hostname,
            "snapshot": snapshot,
            "findings": findings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monokit_alarm::{AlarmConfig, AlertManager, HealthState};
    use monokit_store::MemoryStore;

    fn snapshot() -> Snapshot {
        Snapshot {
            disks: vec![
                DiskUsage {
                    mount: "/".to_string(),
                    total_bytes: 100,
                    used_bytes: 50,
                    percent: 50.0,
                },
                DiskUsage {
                    mount: "/var/lib/mysql".to_string(),
                    total_bytes: 100,
                    used_bytes: 95,
                    percent: 95.0,
                },
            ],
            memory_percent: 40.0,
            load_one: 9.0,
            cpus: 4,
        }
    }

    #[test]
    fn test_disk_key() {
        assert_eq!(disk_key("/"), "osHealth_disk_root");
        assert_eq!(disk_key("/var/lib/mysql"), "osHealth_disk_var_lib_mysql");
        assert_eq!(disk_key("C:\\"), "osHealth_disk_C__");
    }

    #[test]
    fn test_evaluate_thresholds() {
        let findings = evaluate(&snapshot(), &OsHealthConfig::default());
        let keys: Vec<_> = findings.iter().map(|f| (f.key.as_str(), f.healthy)).collect();
        assert_eq!(
            keys,
            vec![
                ("osHealth_disk_root", true),
                ("osHealth_disk_var_lib_mysql", false),
                ("osHealth_memory", true),
                ("osHealth_load", false),
            ]
        );
    }

    #[test]
    fn test_evaluate_ignores_mounts() {
        let thresholds = OsHealthConfig {
            ignore_mounts: vec!["/var/lib/mysql".to_string()],
            ..Default::default()
        };
        let findings = evaluate(&snapshot(), &thresholds);
        assert!(!findings.iter().any(|f| f.key == "osHealth_disk_var_lib_mysql"));
    }

    #[test]
    fn test_render() {
        let report = render("web01", &evaluate(&snapshot(), &OsHealthConfig::default()));
        assert!(report.starts_with("osHealth report for web01"));
        assert!(report.contains("[FAIL] Disk /var/lib/mysql is 95.0% full"));
        assert!(report.contains("[OK  ] Memory usage is 40.0%"));
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(percent(10, 0), 0.0);
        assert_eq!(percent(25, 100), 25.0);
    }

    #[tokio::test]
    async fn test_collect_raises_memory_alarm() {
        let engine = Arc::new(AlarmEngine::new(
            AlarmConfig::default().with_notify_initial_up(false),
            AlertManager::empty(),
            Arc::new(MemoryStore::new()),
        ));
        let thresholds = OsHealthConfig {
            memory_percent: 0.0,
            ..Default::default()
        };
        let provider = OsHealth::new(engine.clone(), thresholds);

        let result = provider.collect("web01").await.unwrap();
        assert!(result.render().contains("osHealth report for web01"));
        assert_eq!(engine.state("osHealth_memory").await.last_state, HealthState::Down);
    }
}
