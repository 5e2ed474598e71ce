//! CLI definitions for Monokit.
//!
//! Static commands are derived; one subcommand per registered component is
//! appended at runtime with the builder API.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{
    Arg, ArgAction, ArgMatches, Args, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
};

use monokit_protocols::ComponentInfo;

/// Flag added to every component subcommand.
pub(crate) const JSON_FLAG: &str = "json";

/// Monokit CLI.
#[derive(Parser)]
#[command(name = "monokit")]
#[command(about = "Infrastructure monitoring agent")]
#[command(version)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags accepted before or after any subcommand.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct GlobalArgs {
    /// Configuration file path
    #[arg(short, long, global = true, env = "MONOKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run even if another instance holds the command's lock file
    #[arg(long, global = true)]
    pub ignore_lockfile: bool,

    /// Restart plugin processes after every daemon batch
    #[arg(long, global = true)]
    pub cleanup_plugins: bool,

    /// Plugin directory (overrides [plugins] dir)
    #[arg(long, global = true)]
    pub plugin_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run all eligible components once or forever
    Daemon {
        /// Run a single batch and exit
        #[arg(long)]
        once: bool,

        /// Print the component catalog and exit
        #[arg(long)]
        list_components: bool,

        /// Seconds between batches (overrides [daemon] interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Manage plugin binaries
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },

    /// List registered components
    Components,

    /// Inspect or reset alarm state
    Alarm {
        #[command(subcommand)]
        action: AlarmAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum PluginAction {
    /// Copy a plugin binary into the plugin directory
    Install {
        /// Path to the plugin executable
        path: PathBuf,

        /// File name to install under (defaults to the source file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List installed plugin files
    List,

    /// Remove an installed plugin file
    Uninstall {
        /// Installed file name
        name: String,
    },
}

#[derive(Subcommand)]
pub(crate) enum AlarmAction {
    /// Show every known alarm key
    List,

    /// Forget the state of an alarm key
    Reset {
        /// Alarm key, e.g. osHealth_memory
        key: String,
    },
}

/// What the parsed command line asks for.
pub(crate) enum Invocation {
    Static(Option<Commands>),
    Component { name: String, json: bool },
}

/// Read global flags before the registry exists.
///
/// Unknown subcommands are expected here: component commands are only added
/// once builtins and plugins are registered.
pub(crate) fn preparse(args: &[OsString]) -> GlobalArgs {
    Cli::command()
        .ignore_errors(true)
        .allow_external_subcommands(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .try_get_matches_from(args)
        .ok()
        .and_then(|matches| GlobalArgs::from_arg_matches(&matches).ok())
        .unwrap_or_default()
}

/// Static commands plus one subcommand per component.
pub(crate) fn build_command(components: &[ComponentInfo]) -> Command {
    let mut command = Cli::command();
    for info in components {
        if command.find_subcommand(&info.name).is_some() {
            tracing::warn!(
                "Component '{}' shadows a built-in command; not exposed on the CLI",
                info.name
            );
            continue;
        }
        command = command.subcommand(component_command(info));
    }
    command
}

fn component_command(info: &ComponentInfo) -> Command {
    let about = if info.description.is_empty() {
        format!("Run the {} check ({})", info.name, info.source)
    } else {
        info.description.clone()
    };
    Command::new(info.name.clone()).about(about).arg(
        Arg::new(JSON_FLAG)
            .long(JSON_FLAG)
            .action(ArgAction::SetTrue)
            .help("Print structured JSON output"),
    )
}

/// Split parsed matches into global flags and the requested invocation.
pub(crate) fn resolve(
    matches: &ArgMatches,
    components: &[ComponentInfo],
) -> Result<(GlobalArgs, Invocation), clap::Error> {
    let global = GlobalArgs::from_arg_matches(matches)?;

    if let Some((name, sub)) = matches.subcommand() {
        let is_component = components.iter().any(|c| c.name == name);
        if is_component && Cli::command().find_subcommand(name).is_none() {
            return Ok((
                global,
                Invocation::Component {
                    name: name.to_string(),
                    json: sub.get_flag(JSON_FLAG),
                },
            ));
        }
    }

    let command = if matches.subcommand().is_some() {
        Some(Commands::from_arg_matches(matches)?)
    } else {
        None
    };
    Ok((global, Invocation::Static(command)))
}
