//! Diagnostics: stderr plus a size-capped log file
//!
//! The watcher normally runs unattended under the session's service manager,
//! so everything also lands in `sync.log`. The file is rotated to
//! `sync.log.old` when it reaches its cap, leaving at most two files.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use crate::constants::{logging, paths};

fn level_from_env() -> LevelFilter {
    match std::env::var(logging::LEVEL_ENV)
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// `$XDG_STATE_HOME/plasma-daynight-sync/sync.log`, falling back to the cache dir
pub fn default_log_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join(paths::APP_DIR).join(paths::LOG_FILE))
}

/// Append-only file that rotates itself once it would grow past `max_bytes`
pub struct CappedWriter {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
}

impl CappedWriter {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create log directory: {}", parent.display()))?;
        }

        let existing = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if existing >= max_bytes {
            rotate(&path).context(format!("Failed to rotate {}", path.display()))?;
        }

        let file = open_append(&path).context(format!("Failed to open log file: {}", path.display()))?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            path,
            file,
            written,
            max_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".old");
    PathBuf::from(name)
}

fn rotate(path: &Path) -> io::Result<()> {
    fs::rename(path, rotated_path(path))
}

impl Write for CappedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.file.flush()?;
            rotate(&self.path)?;
            self.file = open_append(&self.path)?;
            self.written = 0;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Install the global subscriber. Returns the log file in use, if any; when
/// it cannot be opened, logging stays on stderr.
pub fn init() -> Result<Option<PathBuf>> {
    let (sink, sink_error) = match default_log_path() {
        Some(path) => match CappedWriter::open(&path, logging::LOG_MAX_BYTES) {
            Ok(writer) => (Some(writer), None),
            Err(e) => (None, Some(format!("{e:#}"))),
        },
        None => (None, Some("no state or cache directory".to_string())),
    };
    let sink_path = sink.as_ref().map(|w| w.path().to_path_buf());

    let file_layer = sink.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(writer))
    });

    tracing_subscriber::registry()
        .with(level_from_env())
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    if let Some(reason) = sink_error {
        warn!(reason = %reason, "Log file unavailable, logging to stderr only");
    }
    Ok(sink_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotates_when_cap_reached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.log");
        let mut writer = CappedWriter::open(&path, 16).unwrap();

        writer.write_all(b"0123456789\n").unwrap();
        writer.write_all(b"abcdefghij\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(rotated_path(&path)).unwrap(), "0123456789\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "abcdefghij\n");
    }

    #[test]
    fn test_oversized_file_rotated_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.log");
        fs::write(&path, "x".repeat(32)).unwrap();
        fs::write(rotated_path(&path), "older").unwrap();

        let mut writer = CappedWriter::open(&path, 16).unwrap();
        writer.write_all(b"fresh\n").unwrap();

        assert_eq!(fs::read_to_string(rotated_path(&path)).unwrap(), "x".repeat(32));
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_appends_below_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sync.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "one\n").unwrap();

        let mut writer = CappedWriter::open(&path, 1024).unwrap();
        writer.write_all(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert!(!rotated_path(&path).exists());
    }
}
