//! Suppression of duplicate applies across independent trigger sources
//!
//! The watcher and short-lived CLI invocations can both react to the same
//! desktop package switch. Whoever gets through first leaves a timestamped
//! marker; anyone arriving within the window backs off.

use anyhow::{anyhow, Context, Result};
use nix::fcntl::{Flock, FlockArg};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The long-running watcher
    Watcher,
    /// A forced `light` / `dark` / `toggle` command
    Cli,
    /// An external corrective trigger (`sync`), e.g. a location service hook
    Sync,
}

impl TriggerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Watcher => "watch",
            TriggerSource::Cli => "cli",
            TriggerSource::Sync => "sync",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last permitted apply: `<unix-millis> <source>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceMarker {
    pub timestamp_ms: u64,
    pub source: String,
}

impl DebounceMarker {
    pub fn new(source: TriggerSource, at: SystemTime) -> Self {
        Self {
            timestamp_ms: unix_millis(at),
            source: source.as_str().to_string(),
        }
    }

    /// Marker written by `source` at `at`. The timestamp never moves back
    /// past `previous`, so a marker from the future keeps its time.
    pub fn advance(previous: Option<&DebounceMarker>, source: TriggerSource, at: SystemTime) -> Self {
        let mut marker = Self::new(source, at);
        if let Some(previous) = previous {
            marker.timestamp_ms = marker.timestamp_ms.max(previous.timestamp_ms);
        }
        marker
    }

    pub fn parse(contents: &str) -> Option<Self> {
        let mut parts = contents.split_whitespace();
        let timestamp_ms = parts.next()?.parse().ok()?;
        let source = parts.next().unwrap_or("unknown").to_string();
        Some(Self { timestamp_ms, source })
    }

    pub fn render(&self) -> String {
        format!("{} {}\n", self.timestamp_ms, self.source)
    }
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct DebounceGuard {
    path: PathBuf,
    window: Duration,
}

impl DebounceGuard {
    pub fn new(path: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            path: path.into(),
            window,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `source` may apply now. A permitted call records its own marker
    /// before returning, under an exclusive lock on the marker file, so two
    /// racing processes cannot both pass.
    ///
    /// Marker trouble never blocks an apply: the worst case is one extra,
    /// harmless re-apply.
    pub fn should_apply(&self, source: TriggerSource, now: SystemTime) -> bool {
        match self.check_and_record(source, now) {
            Ok(permitted) => permitted,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    source = %source,
                    error = %e,
                    "Debounce marker unusable, applying anyway"
                );
                true
            }
        }
    }

    /// Record a marker without checking, for passes that run unconditionally
    pub fn record(&self, source: TriggerSource, now: SystemTime) -> Result<()> {
        let mut file = self.open_locked()?;
        let existing = read_marker(&mut file)?;
        write_marker(&mut file, &DebounceMarker::advance(existing.as_ref(), source, now))
    }

    pub fn read(&self) -> Option<DebounceMarker> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| DebounceMarker::parse(&contents))
    }

    fn check_and_record(&self, source: TriggerSource, now: SystemTime) -> Result<bool> {
        let mut file = self.open_locked()?;
        let existing = read_marker(&mut file)?;

        let now_ms = unix_millis(now);
        let window_ms = self.window.as_millis() as u64;
        match &existing {
            // abs_diff: a marker from the future (clock skew) only suppresses within the window
            Some(marker) if now_ms.abs_diff(marker.timestamp_ms) < window_ms => {
                info!(
                    source = %source,
                    previous_source = %marker.source,
                    elapsed_ms = now_ms.abs_diff(marker.timestamp_ms),
                    "Apply already handled within debounce window, skipping"
                );
                return Ok(false);
            }
            Some(marker) => {
                debug!(previous_source = %marker.source, "Debounce marker outside window");
            }
            None => {}
        }

        write_marker(&mut file, &DebounceMarker::advance(existing.as_ref(), source, now))?;
        debug!(source = %source, "Debounce marker recorded");
        Ok(true)
    }

    fn open_locked(&self) -> Result<Flock<fs::File>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create runtime directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .context(format!("Failed to open debounce marker: {}", self.path.display()))?;
        Flock::lock(file, FlockArg::LockExclusive)
            .map_err(|(_, errno)| anyhow!("Failed to lock debounce marker: {errno}"))
    }
}

/// Current marker, if the file holds a parsable one
fn read_marker(file: &mut Flock<fs::File>) -> Result<Option<DebounceMarker>> {
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .context("Failed to read debounce marker")?;
    let marker = DebounceMarker::parse(&contents);
    if marker.is_none() && !contents.trim().is_empty() {
        warn!(contents = %contents.trim(), "Ignoring unparsable debounce marker");
    }
    Ok(marker)
}

fn write_marker(file: &mut Flock<fs::File>, marker: &DebounceMarker) -> Result<()> {
    file.set_len(0).context("Failed to truncate debounce marker")?;
    file.seek(SeekFrom::Start(0))
        .context("Failed to rewind debounce marker")?;
    file.write_all(marker.render().as_bytes())
        .context("Failed to write debounce marker")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(dir: &Path) -> DebounceGuard {
        DebounceGuard::new(dir.join("debounce"), Duration::from_secs(3))
    }

    #[test]
    fn test_first_request_permitted_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        assert!(guard.should_apply(TriggerSource::Watcher, now));
        let marker = guard.read().unwrap();
        assert_eq!(marker.source, "watch");
        assert_eq!(marker.timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_second_source_within_window_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        assert!(guard.should_apply(TriggerSource::Watcher, now));
        assert!(!guard.should_apply(TriggerSource::Sync, now + Duration::from_secs(1)));
        // suppressed requests leave the marker alone
        assert_eq!(guard.read().unwrap().source, "watch");
    }

    #[test]
    fn test_request_after_window_permitted() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        assert!(guard.should_apply(TriggerSource::Cli, now));
        assert!(guard.should_apply(TriggerSource::Watcher, now + Duration::from_secs(3)));
        assert_eq!(guard.read().unwrap().source, "watch");
    }

    #[test]
    fn test_future_marker_outside_window_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        guard.record(TriggerSource::Sync, now + Duration::from_secs(60)).unwrap();
        assert!(guard.should_apply(TriggerSource::Watcher, now));

        let near = DebounceGuard::new(dir.path().join("near"), Duration::from_secs(3));
        near.record(TriggerSource::Sync, now + Duration::from_secs(1)).unwrap();
        assert!(!near.should_apply(TriggerSource::Watcher, now));
    }

    #[test]
    fn test_marker_never_moves_backwards() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        // permitted apply against a future marker keeps the later time
        guard.record(TriggerSource::Sync, now + Duration::from_secs(100)).unwrap();
        assert!(guard.should_apply(TriggerSource::Watcher, now));
        let marker = guard.read().unwrap();
        assert_eq!(marker.timestamp_ms, 1_700_000_100_000);
        assert_eq!(marker.source, "watch");

        // an unconditional record with a stale clock reading does too
        let later = now + Duration::from_secs(200);
        guard.record(TriggerSource::Sync, later).unwrap();
        guard.record(TriggerSource::Watcher, now + Duration::from_secs(150)).unwrap();
        let marker = guard.read().unwrap();
        assert_eq!(marker.timestamp_ms, 1_700_000_200_000);
        assert_eq!(marker.source, "watch");

        guard.record(TriggerSource::Cli, now + Duration::from_secs(300)).unwrap();
        assert_eq!(guard.read().unwrap().timestamp_ms, 1_700_000_300_000);
    }

    #[test]
    fn test_corrupt_marker_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        fs::write(guard.path(), "garbage").unwrap();
        assert!(guard.should_apply(TriggerSource::Cli, SystemTime::now()));
        assert_eq!(guard.read().unwrap().source, "cli");
    }

    #[test]
    fn test_unwritable_marker_still_permits() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the marker file should be
        let guard = DebounceGuard::new(dir.path(), Duration::from_secs(3));
        assert!(guard.should_apply(TriggerSource::Cli, SystemTime::now()));
    }

    #[test]
    fn test_marker_parse() {
        assert_eq!(
            DebounceMarker::parse("1700000000123 sync\n"),
            Some(DebounceMarker {
                timestamp_ms: 1_700_000_000_123,
                source: "sync".to_string()
            })
        );
        assert_eq!(DebounceMarker::parse(""), None);
        assert_eq!(DebounceMarker::parse("soon watch"), None);
    }
}
