//! Last-applied mode, for display only

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::mode::Mode;

pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mode: Mode) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create runtime directory: {}", parent.display()))?;
        }
        fs::write(&self.path, format!("{mode}\n"))
            .context(format!("Failed to write status file: {}", self.path.display()))
    }

    /// `None` if nothing was applied this session or the file is unreadable
    pub fn read(&self) -> Option<Mode> {
        fs::read_to_string(&self.path).ok()?.parse().ok()
    }
}
