//! The long-running watcher loop

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::apply::{ApplyEngine, ApplyOrigin, ApplyReport};
use crate::config::Settings;
use crate::constants::timing;
use crate::desktop::watch::drain;
use crate::desktop::Desktop;
use crate::mode::{Mode, ModeResolver};
use crate::runtime::{DebounceGuard, TriggerSource};

/// Follows the desktop's active package and applies each mode change once
pub struct ModeMonitor<'a> {
    desktop: &'a dyn Desktop,
    settings: &'a Settings,
    engine: &'a ApplyEngine,
    guard: DebounceGuard,
    settle: Duration,
    last_applied: Option<Mode>,
}

impl<'a> ModeMonitor<'a> {
    pub fn new(
        desktop: &'a dyn Desktop,
        settings: &'a Settings,
        engine: &'a ApplyEngine,
        guard: DebounceGuard,
    ) -> Self {
        debug!(marker = %guard.path().display(), "Debounce marker");
        Self {
            desktop,
            settings,
            engine,
            guard,
            settle: timing::WATCH_SETTLE_DELAY,
            last_applied: None,
        }
    }

    /// Pause between a notification and reading the new package, giving the
    /// desktop time to finish its own switch
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn last_applied(&self) -> Option<Mode> {
        self.last_applied
    }

    fn current_mode(&self) -> Option<Mode> {
        match self.desktop.active_theme_package() {
            Ok(active) => ModeResolver::new(&self.settings.laf).resolve(&active),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to read active theme package");
                None
            }
        }
    }

    /// One unconditional pass for whatever mode is active now. The desktop may
    /// have switched before we were started (e.g. at login).
    pub fn start(&mut self, now: SystemTime) -> Option<ApplyReport> {
        let mode = self.current_mode()?;
        info!(mode = %mode, "Initial apply");
        let report = self
            .engine
            .apply(self.desktop, self.settings, mode, ApplyOrigin::PackageSwitch);
        if let Err(e) = self.guard.record(TriggerSource::Watcher, now) {
            warn!(error = %format!("{e:#}"), "Failed to record debounce marker");
        }
        self.last_applied = Some(mode);
        Some(report)
    }

    /// React to one (coalesced) change notification
    pub fn handle_change(&mut self, now: SystemTime) -> Option<ApplyReport> {
        let mode = self.current_mode()?;
        if self.last_applied == Some(mode) {
            debug!(mode = %mode, "Mode unchanged, nothing to do");
            return None;
        }
        if !self.guard.should_apply(TriggerSource::Watcher, now) {
            return None;
        }

        info!(from = ?self.last_applied, to = %mode, "Mode changed");
        let report = self
            .engine
            .apply(self.desktop, self.settings, mode, ApplyOrigin::PackageSwitch);
        self.last_applied = Some(mode);
        Some(report)
    }

    /// Block on notifications until `shutdown` is raised. Returns an error if
    /// the notification source goes away, so the supervisor restarts us.
    pub fn run(&mut self, events: &Receiver<()>, shutdown: &AtomicBool) -> Result<()> {
        info!("Waiting for theme changes");
        while !shutdown.load(Ordering::Relaxed) {
            match events.recv_timeout(timing::SHUTDOWN_POLL) {
                Ok(()) => {
                    let coalesced = drain(events);
                    if !self.settle.is_zero() {
                        thread::sleep(self.settle);
                    }
                    let coalesced = coalesced + drain(events);
                    debug!(coalesced = coalesced, "Change notification");
                    self.handle_change(SystemTime::now());
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => bail!("Change notifications stopped"),
            }
        }
        info!("Shutdown requested, leaving watch loop");
        Ok(())
    }
}
