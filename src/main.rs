//! Monokit - infrastructure monitoring agent
//!
//! Main entry point for the Monokit CLI and daemon.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use monokit_alarm::{AlarmEngine, AlertManager, RedmineTracker};
use monokit_config::{Config, ConfigLoader, ConfigValidator};
use monokit_core::ComponentRegistry;
use monokit_daemon::{DaemonError, LockFile, SignalHandler};
use monokit_plugin_host::{PluginHost, PluginHostConfig};
use monokit_store::{KvStore, MemoryStore, SqliteStore};

mod adapters;
mod builtins;
mod cli;
mod cmd_component;
mod cmd_daemon;
mod cmd_plugin;

use cli::{Commands, GlobalArgs, Invocation};

/// Exit code after an interrupt.
const EXIT_INTERRUPTED: i32 = 130;

/// Everything a command handler needs.
pub(crate) struct App {
    pub config: Config,
    pub global: GlobalArgs,
    pub registry: Arc<ComponentRegistry>,
    pub alarms: Arc<AlarmEngine>,
    pub host: Arc<PluginHost>,
    pub store: Arc<dyn KvStore>,
    pub plugin_dir: PathBuf,
    pub hostname: String,
    pub signals: SignalHandler,
}

impl App {
    /// Take the lock file for `command`, unless `--ignore-lockfile` was given.
    pub(crate) fn lock(&self, command: &str) -> Result<Option<LockFile>, DaemonError> {
        if self.global.ignore_lockfile {
            return Ok(None);
        }
        let mut lock = LockFile::for_command(&self.config.daemon.lock_dir(), command);
        lock.try_acquire()?;
        Ok(Some(lock))
    }
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.monokit/logs/ with daily rotation.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = adapters::log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("monokit")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn init_console_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_config(global: &GlobalArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let path = global.config.clone().unwrap_or_else(ConfigLoader::default_path);
    let config = ConfigLoader::load_or_default(&path)?;
    debug!("Configuration loaded from {}", path.display());

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    if let Some(err) = validation.into_error() {
        return Err(err.into());
    }
    Ok(config)
}

async fn open_store(config: &Config) -> Arc<dyn KvStore> {
    let path = config.store.path();
    match SqliteStore::open(&path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "Cannot open state store {}: {}; alarm state will not persist",
                path.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Build registry, alarm engine and plugin host, and load plugins.
async fn build_app(config: Config, global: GlobalArgs) -> App {
    let hostname = local_hostname();
    let store = open_store(&config).await;

    let alerts = AlertManager::from_config(&config.alarm);
    let mut alarms = AlarmEngine::new(config.alarm.clone(), alerts, store.clone())
        .with_hostname(hostname.clone());
    if config.tracker.enabled {
        match RedmineTracker::new(&config.tracker) {
            Ok(tracker) => alarms = alarms.with_tracker(Arc::new(tracker)),
            Err(e) => error!("Issue tracker disabled: {}", e),
        }
    }
    let alarms = Arc::new(alarms);

    let registry = Arc::new(ComponentRegistry::new());
    builtins::register_builtins(&registry, &config, &alarms);

    let host = Arc::new(PluginHost::new(
        PluginHostConfig::default()
            .with_handshake_timeout(config.plugins.handshake_timeout())
            .with_call_timeout(config.plugins.call_timeout())
            .with_shutdown_timeout(config.plugins.shutdown_timeout()),
        registry.clone(),
    ));

    let plugin_dir = global.plugin_dir.clone().unwrap_or_else(|| config.plugins.dir());
    if plugin_dir.is_dir() {
        if let Err(e) = host.discover(&plugin_dir).await {
            warn!("Plugin discovery failed: {}", e);
        }
    } else {
        debug!("Plugin directory {} does not exist", plugin_dir.display());
    }

    for name in &config.components.disabled {
        if let Err(e) = registry.set_enabled(name, false) {
            warn!("Cannot disable component: {}", e);
        }
    }

    App {
        config,
        global,
        registry,
        alarms,
        host,
        store,
        plugin_dir,
        hostname,
        signals: SignalHandler::new(),
    }
}

/// Stop plugins and exit once shutdown is requested.
///
/// `grace` gives the normal exit path a chance to finish first.
fn spawn_interrupt_task(app: &App, grace: Duration) {
    let signals = app.signals.clone();
    let host = app.host.clone();
    tokio::spawn(async move {
        signals.wait_for_shutdown().await;
        tokio::time::sleep(grace).await;
        let stopped = host.cleanup_all().await;
        warn!("Interrupted; stopped {} plugin process(es)", stopped);
        std::process::exit(EXIT_INTERRUPTED);
    });
}

async fn dispatch(app: &App, invocation: Invocation) -> Result<(), Box<dyn std::error::Error>> {
    match invocation {
        Invocation::Component { name, json } => {
            cmd_component::run_component(app, &name, json).await
        }
        Invocation::Static(None) => {
            let mut command = cli::build_command(&app.registry.infos());
            command.print_help()?;
            Ok(())
        }
        Invocation::Static(Some(command)) => match command {
            Commands::Daemon {
                once,
                list_components,
                interval,
            } => cmd_daemon::handle_daemon_command(app, once, list_components, interval).await,
            Commands::Components => cmd_daemon::show_components(app).await,
            Commands::Plugin { action } => cmd_plugin::handle_plugin_command(app, action).await,
            Commands::Alarm { action } => cmd_component::handle_alarm_command(app, action).await,
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        init_console_tracing();
        warn!("File logging disabled: {}", e);
    }

    let args: Vec<OsString> = std::env::args_os().collect();
    let global = cli::preparse(&args);

    let config = match load_config(&global) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut app = build_app(config, global).await;
    info!("Monokit v{} on {}", env!("CARGO_PKG_VERSION"), app.hostname);

    let components = app.registry.infos();
    let parsed = cli::build_command(&components)
        .try_get_matches_from(&args)
        .and_then(|matches| cli::resolve(&matches, &components));
    let (global, invocation) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            app.host.cleanup_all().await;
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(2) } else { ExitCode::SUCCESS };
        }
    };
    app.global = global;

    if let Err(e) = app.signals.setup_os_signals() {
        warn!("{}", e);
    }
    let is_daemon = matches!(invocation, Invocation::Static(Some(Commands::Daemon { .. })));
    let grace = if is_daemon {
        app.config.plugins.shutdown_timeout()
    } else {
        Duration::ZERO
    };
    spawn_interrupt_task(&app, grace);

    let result = dispatch(&app, invocation).await;

    app.host.cleanup_all().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
