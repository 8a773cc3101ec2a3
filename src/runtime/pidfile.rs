//! Watcher liveness, so CLI commands can leave the apply pass to it

use anyhow::{bail, Context, Result};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held by the running watcher; the file is removed on drop while it still names us
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Fails if another live watcher already owns `path`
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if watcher_running(&path) {
            bail!("Another watcher is already running (pid file {})", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create runtime directory: {}", parent.display()))?;
        }
        fs::write(&path, format!("{}\n", std::process::id()))
            .context(format!("Failed to write pid file: {}", path.display()))?;
        Ok(Self { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if read_pid(&self.path) == Some(std::process::id() as i32) {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn read_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|contents| contents.trim().parse::<i32>().ok())
}

/// True if another live process owns the pid file
pub fn watcher_running(path: &Path) -> bool {
    let Some(pid) = read_pid(path) else {
        return false;
    };

    if pid <= 0 || pid as u32 == std::process::id() {
        return false;
    }

    // signal 0 only checks existence; EPERM still means the process exists
    let alive = match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    };
    debug!(pid = pid, alive = alive, "Checked watcher pid");
    alive
}
