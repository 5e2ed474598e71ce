//! Plugin subcommand handlers.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use monokit_core::detect;

use crate::App;
use crate::cli::PluginAction;

/// Handle plugin subcommands.
pub(crate) async fn handle_plugin_command(
    app: &App,
    action: PluginAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PluginAction::Install { path, name } => {
            let installed = install(&app.plugin_dir, &path, name.as_deref())?;
            println!("Installed {}", installed.display());
            println!("Run `monokit components` to verify it loads.");
            Ok(())
        }
        PluginAction::List => {
            plugin_list(app)?;
            Ok(())
        }
        PluginAction::Uninstall { name } => {
            let removed = uninstall(&app.plugin_dir, &name)?;
            println!("Removed {}", removed.display());
            Ok(())
        }
    }
}

/// Copy `source` into `dir` and mark it executable.
pub(crate) fn install(
    dir: &Path,
    source: &Path,
    name: Option<&str>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if !source.is_file() {
        return Err(format!("{} is not a file", source.display()).into());
    }

    let file_name = match name {
        Some(name) => name.to_string(),
        None => source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| format!("{} has no file name", source.display()))?,
    };
    validate_name(&file_name)?;

    fs::create_dir_all(dir)?;
    let target = dir.join(&file_name);
    fs::copy(source, &target)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&target, fs::Permissions::from_mode(0o755))?;
    }

    info!("Installed plugin {} -> {}", source.display(), target.display());
    Ok(target)
}

/// Remove an installed plugin file.
pub(crate) fn uninstall(dir: &Path, name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    validate_name(name)?;
    let target = dir.join(name);
    if !target.is_file() {
        return Err(format!("Plugin {} is not installed in {}", name, dir.display()).into());
    }
    fs::remove_file(&target)?;
    info!("Uninstalled plugin {}", target.display());
    Ok(target)
}

/// Installed plugin files, sorted, hidden files skipped.
pub(crate) fn installed(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn plugin_list(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    let files = installed(&app.plugin_dir)?;
    if files.is_empty() {
        println!("No plugins installed in {}", app.plugin_dir.display());
        return Ok(());
    }

    let loaded = app.host.loaded_names();
    for file in files {
        let component = loaded
            .iter()
            .find(|name| app.host.binary_path(name).as_deref() == Some(file.as_path()));
        match component {
            Some(name) => println!("{}  (component: {})", file.display(), name),
            None if !detect::is_executable(&file) => {
                println!("{}  (not executable)", file.display())
            }
            None => println!("{}  (not loaded)", file.display()),
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    if name.is_empty() || name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return Err(format!("Invalid plugin file name: {:?}", name).into());
    }
    Ok(())
}
