//! Change notifications for the watched configuration file

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

/// Keeps the underlying watcher alive; notifications stop when dropped
pub struct Subscription {
    _watcher: RecommendedWatcher,
    pub events: Receiver<()>,
}

/// Subscribe to changes of `file`.
///
/// KDE replaces config files by renaming a temporary file over them, which
/// drops a watch on the file itself, so the parent directory is watched and
/// events are filtered by file name.
pub fn subscribe(file: &Path) -> Result<Subscription> {
    let dir = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = file
        .file_name()
        .context(format!("Watched path has no file name: {}", file.display()))?
        .to_os_string();

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        forward(res, &name, &tx);
    })
    .context("Failed to create file watcher")?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .context(format!("Failed to watch {}", dir.display()))?;
    debug!(path = %file.display(), "Watching for changes");

    Ok(Subscription {
        _watcher: watcher,
        events: rx,
    })
}

fn forward(res: notify::Result<Event>, name: &OsString, tx: &Sender<()>) {
    match res {
        Ok(event) => {
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            if event.paths.iter().any(|p| p.file_name() == Some(name.as_os_str())) {
                // receiver gone means the monitor is shutting down
                let _ = tx.send(());
            }
        }
        Err(e) => warn!(error = %e, "File watcher error"),
    }
}

/// Discard notifications already queued; one wake-up covers a burst of writes
pub fn drain(events: &Receiver<()>) -> usize {
    events.try_iter().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> notify::Result<Event> {
        Ok(Event::new(kind).add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_forward_filters_by_name_and_kind() {
        let (tx, rx) = mpsc::channel();
        let name = OsString::from("kdeglobals");

        forward(event(EventKind::Modify(ModifyKind::Any), "/home/u/.config/kdeglobals"), &name, &tx);
        forward(event(EventKind::Create(CreateKind::File), "/home/u/.config/kdeglobals"), &name, &tx);
        forward(event(EventKind::Modify(ModifyKind::Any), "/home/u/.config/kwinrc"), &name, &tx);
        forward(event(EventKind::Remove(RemoveKind::File), "/home/u/.config/kdeglobals"), &name, &tx);

        assert_eq!(drain(&rx), 2);
        assert_eq!(drain(&rx), 0);
    }
}
