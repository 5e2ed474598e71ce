//! Auto-detection helpers for component predicates.
//!
//! Each helper is cheap and side-effect free so it can be evaluated on every
//! scheduler cycle.

use std::path::Path;

/// Whether a path exists on this host.
pub fn path_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Build an auto-detect predicate that checks for any of the given paths.
pub fn requires_any_path<P>(paths: Vec<P>) -> impl Fn() -> bool + Send + Sync + 'static
where
    P: AsRef<Path> + Send + Sync + 'static,
{
    move || paths.iter().any(path_exists)
}

/// Check if a file has any executable bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}
