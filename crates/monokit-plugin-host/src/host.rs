//! Plugin discovery, loading and supervision.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use monokit_protocols::{Component, ComponentRegistryAccess, ComponentSource, Platform};

use crate::client::PluginClient;
use crate::error::PluginError;
use crate::protocol::{
    COOKIE_ENV, Handshake, MAGIC_COOKIE_VALUE, PROTOCOL_VERSION, PROTOCOL_VERSION_ENV,
    STDIO_TRANSPORT,
};
use crate::provider::PluginProvider;
use crate::transport::StdioTransport;

/// Plugin host configuration.
#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    /// Time a plugin has to print its handshake line.
    pub handshake_timeout: Duration,
    /// Upper bound of a single RPC call.
    pub call_timeout: Duration,
    /// Grace period between closing stdin and killing a plugin.
    pub shutdown_timeout: Duration,
    /// Magic cookie exported to plugins.
    pub magic_cookie: String,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(5),
            magic_cookie: MAGIC_COOKIE_VALUE.to_string(),
        }
    }
}

impl PluginHostConfig {
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Outcome of scanning a plugin directory.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Component names registered, in load order.
    pub loaded: Vec<String>,
    /// Files that failed to load, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// A live plugin subprocess.
struct PluginProcess {
    name: String,
    binary_path: PathBuf,
    transport: Arc<StdioTransport>,
    client: Arc<PluginClient>,
}

/// Discovers, launches and supervises plugin processes.
pub struct PluginHost {
    config: PluginHostConfig,
    registry: Arc<dyn ComponentRegistryAccess>,
    processes: Mutex<HashMap<String, PluginProcess>>,
    /// Names this host registered, with the entry each one replaced.
    registered: Mutex<BTreeMap<String, Option<Arc<Component>>>>,
    cancel: Mutex<CancellationToken>,
}

impl PluginHost {
    pub fn new(config: PluginHostConfig, registry: Arc<dyn ComponentRegistryAccess>) -> Self {
        Self {
            config,
            registry,
            processes: Mutex::new(HashMap::new()),
            registered: Mutex::new(BTreeMap::new()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &PluginHostConfig {
        &self.config
    }

    /// Number of live plugin processes.
    pub fn live_count(&self) -> usize {
        self.processes.lock().len()
    }

    /// Names of live plugins, sorted.
    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processes.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Binary path of a live plugin.
    pub fn binary_path(&self, name: &str) -> Option<PathBuf> {
        self.processes.lock().get(name).map(|p| p.binary_path.clone())
    }

    /// Provider of a live plugin, for direct calls.
    pub fn provider(&self, name: &str) -> Option<Arc<PluginProvider>> {
        self.processes
            .lock()
            .get(name)
            .map(|p| Arc::new(PluginProvider::new(p.name.clone(), p.client.clone())))
    }

    /// Load every plugin in `dir`.
    ///
    /// Individual failures are logged and reported; only an unreadable
    /// directory is an error.
    pub async fn discover(&self, dir: &Path) -> Result<DiscoveryReport, PluginError> {
        self.discover_with(dir, &HashSet::new()).await
    }

    /// Discover `dir`, registering the names in `disabled` as disabled.
    async fn discover_with(
        &self,
        dir: &Path,
        disabled: &HashSet<String>,
    ) -> Result<DiscoveryReport, PluginError> {
        let unreadable = |source| PluginError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let file_name = entry.file_name();
            if file_name.to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            // Follows symlinks.
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => candidates.push(path),
                _ => debug!("Skipping non-file {}", path.display()),
            }
        }
        candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut report = DiscoveryReport::default();
        for path in candidates {
            match self.load_with(&path, disabled).await {
                Ok(name) => report.loaded.push(name),
                Err(e) => {
                    warn!("Failed to load plugin {}: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        info!(
            "Plugin discovery in {}: {} loaded, {} failed",
            dir.display(),
            report.loaded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Launch, handshake and register one plugin. Returns its component name.
    pub async fn load(&self, path: &Path) -> Result<String, PluginError> {
        self.load_with(path, &HashSet::new()).await
    }

    async fn load_with(
        &self,
        path: &Path,
        disabled: &HashSet<String>,
    ) -> Result<String, PluginError> {
        if !is_executable(path) {
            return Err(PluginError::NotExecutable(path.to_path_buf()));
        }

        let child = Command::new(path)
            .env(COOKIE_ENV, &self.config.magic_cookie)
            .env(PROTOCOL_VERSION_ENV, PROTOCOL_VERSION.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PluginError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        let transport = Arc::new(
            StdioTransport::new(child)
                .map_err(|e| PluginError::HandshakeMalformed(e.to_string()))?,
        );

        let client = match self.handshake(&transport).await {
            Ok(client) => client,
            Err(e) => {
                if let Err(kill_err) = transport.kill().await {
                    debug!("Failed to kill rejected plugin: {}", kill_err);
                }
                return Err(e);
            }
        };
        let name = match client.name().await {
            Ok(name) => name,
            Err(e) => {
                let _ = transport.kill().await;
                return Err(e.into());
            }
        };

        let previous = self.processes.lock().remove(&name);
        if let Some(previous) = previous {
            info!("Plugin '{}' is already running, stopping the old process", name);
            self.stop(previous).await;
        }

        let provider = Arc::new(PluginProvider::new(name.clone(), client.clone()));
        let component = Component::from_provider(provider, ComponentSource::Plugin)
            .with_platform(Platform::Any)
            .with_description(format!("Plugin {}", path.display()))
            .with_enabled(!disabled.contains(&name));
        let replaced = self.registry.register_component(component);
        {
            // A second load of the same name keeps the entry the first one replaced.
            let mut registered = self.registered.lock();
            let shadowed = registered.remove(&name).unwrap_or(replaced);
            registered.insert(name.clone(), shadowed);
        }

        info!(
            "Loaded plugin '{}' from {} (pid {:?})",
            name,
            path.display(),
            transport.pid()
        );
        self.processes.lock().insert(
            name.clone(),
            PluginProcess {
                name: name.clone(),
                binary_path: path.to_path_buf(),
                transport,
                client,
            },
        );
        Ok(name)
    }

    async fn handshake(
        &self,
        transport: &Arc<StdioTransport>,
    ) -> Result<Arc<PluginClient>, PluginError> {
        let timeout = self.config.handshake_timeout;
        let line = tokio::time::timeout(timeout, transport.read_line())
            .await
            .map_err(|_| PluginError::HandshakeTimeout(timeout))?
            .map_err(|e| PluginError::HandshakeMalformed(format!("no handshake line: {}", e)))?;

        let handshake: Handshake = serde_json::from_str(&line)
            .map_err(|e| PluginError::HandshakeMalformed(format!("{}: {:?}", e, line)))?;

        if handshake.magic_cookie_key != COOKIE_ENV
            || handshake.magic_cookie_value != self.config.magic_cookie
        {
            return Err(PluginError::CookieMismatch);
        }
        if handshake.protocol_version != PROTOCOL_VERSION {
            return Err(PluginError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                found: handshake.protocol_version,
            });
        }
        if handshake.transport != STDIO_TRANSPORT {
            return Err(PluginError::HandshakeMalformed(format!(
                "unsupported transport {:?}",
                handshake.transport
            )));
        }

        let token = self.cancel.lock().child_token();
        Ok(Arc::new(PluginClient::new(
            transport.clone(),
            self.config.call_timeout,
            token,
        )))
    }

    async fn stop(&self, process: PluginProcess) {
        if let Err(e) = process.client.shutdown().await {
            debug!("Plugin '{}' shutdown notification failed: {}", process.name, e);
        }
        match process.transport.shutdown(self.config.shutdown_timeout).await {
            Ok(status) => debug!("Plugin '{}' exited: {:?}", process.name, status),
            Err(e) => warn!("Failed to stop plugin '{}': {}", process.name, e),
        }
    }

    /// Stop every live plugin. Returns the number stopped.
    ///
    /// In-flight calls are cancelled first. A second call finds nothing to do.
    pub async fn cleanup_all(&self) -> usize {
        let drained: Vec<PluginProcess> = {
            let mut processes = self.processes.lock();
            processes.drain().map(|(_, process)| process).collect()
        };
        {
            let mut cancel = self.cancel.lock();
            cancel.cancel();
            *cancel = CancellationToken::new();
        }

        let count = drained.len();
        for process in drained {
            self.stop(process).await;
        }
        if count > 0 {
            info!("Stopped {} plugin process(es)", count);
        }
        count
    }

    /// Stop all plugins, drop their components and discover `dir` again.
    ///
    /// Entries a plugin replaced come back when the plugin does not reload,
    /// and plugins that were disabled stay disabled.
    pub async fn reload(&self, dir: &Path) -> Result<DiscoveryReport, PluginError> {
        self.cleanup_all().await;
        let disabled = self.unregister_all();
        self.discover_with(dir, &disabled).await
    }

    /// Remove every component this host registered and restore what they
    /// replaced. Returns the names that were disabled.
    fn unregister_all(&self) -> HashSet<String> {
        let registered = std::mem::take(&mut *self.registered.lock());
        let mut disabled = HashSet::new();
        for (name, shadowed) in registered {
            if let Some(removed) = self.registry.unregister_component(&name) {
                if !removed.is_enabled() {
                    disabled.insert(name.clone());
                }
            }
            if let Some(previous) = shadowed {
                debug!("Restoring {} component '{}'", previous.source(), name);
                self.registry.restore_component(previous);
            }
        }
        disabled
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
