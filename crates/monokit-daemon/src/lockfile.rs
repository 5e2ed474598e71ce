//! Per-command lock files.
//!
//! A lock file holds the PID of the process running a command. A lock left
//! behind by a dead process is removed and taken over.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::DaemonError;

#[cfg(test)]
#[path = "lockfile_tests.rs"]
mod tests;

#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    locked: bool,
}

impl LockFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            locked: false,
        }
    }

    /// `<dir>/monokit-<command>.lock`.
    pub fn for_command(dir: &Path, command: &str) -> Self {
        let safe: String = command
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Self::new(dir.join(format!("monokit-{}.lock", safe)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// PID recorded in the lock file, if any.
    pub fn read_pid(&self) -> Result<Option<u32>, DaemonError> {
        if !self.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| DaemonError::LockFileRead {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let pid = contents
            .trim()
            .parse::<u32>()
            .map_err(|e| DaemonError::LockFileRead {
                path: self.path.clone(),
                reason: format!("Invalid PID format: {}", e),
            })?;

        Ok(Some(pid))
    }

    fn write_pid_value(&mut self, pid: u32) -> Result<(), DaemonError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| DaemonError::LockFileCreation {
                path: self.path.clone(),
                reason: format!("Failed to create parent directory: {}", e),
            })?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| DaemonError::LockFileCreation {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        write!(file, "{}", pid).map_err(|e| DaemonError::LockFileCreation {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        self.locked = true;
        debug!("Lock file created: {} (PID: {})", self.path.display(), pid);
        Ok(())
    }

    /// Whether a process with the given PID is alive.
    #[cfg(unix)]
    pub fn is_process_running(pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            // The process exists but belongs to someone else.
            Err(nix::errno::Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    pub fn is_process_running(_pid: u32) -> bool {
        true
    }

    /// Take the lock for the current process.
    pub fn try_acquire(&mut self) -> Result<(), DaemonError> {
        self.try_acquire_as(std::process::id())
    }

    fn try_acquire_as(&mut self, pid: u32) -> Result<(), DaemonError> {
        match self.read_pid() {
            Ok(Some(existing)) if existing != pid && Self::is_process_running(existing) => {
                return Err(DaemonError::AlreadyRunning {
                    path: self.path.clone(),
                    pid: existing,
                });
            }
            Ok(Some(existing)) if existing != pid => {
                warn!(
                    "Removing stale lock file (PID {} not running): {}",
                    existing,
                    self.path.display()
                );
                self.remove_file()?;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Replacing unreadable lock file: {}", e);
                self.remove_file()?;
            }
        }

        self.write_pid_value(pid)
    }

    fn remove_file(&self) -> Result<(), DaemonError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DaemonError::LockFileRemoval {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Release the lock if this process holds it.
    pub fn release(&mut self) -> Result<(), DaemonError> {
        if !self.locked {
            return Ok(());
        }
        self.remove_file()?;
        self.locked = false;
        debug!("Lock file removed: {}", self.path.display());
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to remove lock file on drop: {}", e);
        }
    }
}
