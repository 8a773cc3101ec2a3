//! Per-session runtime files shared between the watcher and CLI invocations
//!
//! Everything here lives under `XDG_RUNTIME_DIR`, so it disappears with the
//! session.

pub mod debounce;
pub mod pidfile;
pub mod status;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::paths;

pub use debounce::{DebounceGuard, TriggerSource};
pub use pidfile::{watcher_running, PidFile};
pub use status::StatusFile;

/// Session runtime directory (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_runtime_dir() -> Result<PathBuf> {
    if let Some(runtime_dir) = std::env::var_os("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(paths::APP_DIR));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(paths::APP_DIR))
}

/// Locations of the runtime files inside one directory
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    dir: PathBuf,
}

impl RuntimePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(default_runtime_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn debounce_marker(&self) -> PathBuf {
        self.dir.join(paths::DEBOUNCE_MARKER)
    }

    pub fn status(&self) -> PathBuf {
        self.dir.join(paths::STATUS_FILE)
    }

    pub fn watcher_pid(&self) -> PathBuf {
        self.dir.join(paths::WATCHER_PID)
    }
}
