//! CLI command implementations
//!
//! Each command gets its collaborators passed in, so everything but process
//! setup is exercised by the tests below against fakes.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::apply::{ApplyEngine, ApplyOrigin, ApplyReport};
use crate::config::{ConfigStore, Settings, ThemePair};
use crate::constants::timing;
use crate::desktop::{watch, Desktop};
use crate::forge::{ForgeOverrides, ThemeForge};
use crate::mode::{normalize_package_id, Mode, ModeResolver};
use crate::monitor::ModeMonitor;
use crate::runtime::{watcher_running, DebounceGuard, PidFile, RuntimePaths, StatusFile, TriggerSource};

/// What every mode command works against
pub struct Session<'a> {
    pub desktop: &'a dyn Desktop,
    pub engine: &'a ApplyEngine,
    pub runtime: &'a RuntimePaths,
    /// Pause after switching packages before applying; Plasma gives no completion signal
    pub settle: Duration,
}

impl Session<'_> {
    fn guard(&self) -> DebounceGuard {
        DebounceGuard::new(self.runtime.debounce_marker(), timing::DEBOUNCE_WINDOW)
    }

    fn active_mode(&self, settings: &Settings) -> Result<Option<Mode>> {
        let active = self.desktop.active_theme_package()?;
        Ok(ModeResolver::new(&settings.laf).resolve(&active))
    }

    fn settle(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }
}

/// `watch`: run the monitor until `shutdown` is raised
pub fn watch(session: &Session, settings: &Settings, watched: &Path, shutdown: &AtomicBool) -> Result<()> {
    let _pid = PidFile::create(session.runtime.watcher_pid())?;
    let subscription = watch::subscribe(watched)?;
    info!(
        watched = %watched.display(),
        runtime = %session.runtime.dir().display(),
        "Watching for theme package switches"
    );

    let mut monitor = ModeMonitor::new(session.desktop, settings, session.engine, session.guard())
        .with_settle(session.settle);
    if monitor.start(SystemTime::now()).is_none() {
        warn!("Active package is not a configured one, waiting for the next change");
    }
    monitor.run(&subscription.events, shutdown)
}

/// `light` / `dark`: switch packages, then run one pass unless the watcher will
pub fn force(session: &Session, settings: &Settings, mode: Mode, now: SystemTime) -> Result<Option<ApplyReport>> {
    let Some(package) = settings.laf.get(mode) else {
        bail!("Only light or dark can be forced, got {mode}");
    };

    if session.desktop.automatic_enabled()? {
        info!("Disabling automatic day/night switching");
        session.desktop.set_automatic(false)?;
    }
    info!(mode = %mode, package = %package, "Switching theme package");
    session
        .desktop
        .apply_theme_package(package)
        .context(format!("Failed to switch to {package}"))?;

    if watcher_running(&session.runtime.watcher_pid()) {
        info!("Watcher is running and will apply the change");
        return Ok(None);
    }

    session.settle();
    if !session.guard().should_apply(TriggerSource::Cli, now) {
        return Ok(None);
    }
    Ok(Some(session.engine.apply(
        session.desktop,
        settings,
        mode,
        ApplyOrigin::PackageSwitch,
    )))
}

/// Mode `toggle` switches to; dark when the active package is not a configured one
pub fn toggle_target(session: &Session, settings: &Settings) -> Result<Mode> {
    Ok(session
        .active_mode(settings)?
        .map_or(Mode::Dark, Mode::opposite))
}

pub fn toggle(session: &Session, settings: &Settings, now: SystemTime) -> Result<Option<ApplyReport>> {
    let target = toggle_target(session, settings)?;
    force(session, settings, target, now)
}

/// `auto`: hand light/dark selection back to the desktop
pub fn auto(desktop: &dyn Desktop) -> Result<()> {
    desktop.set_automatic(true)?;
    info!("Automatic day/night switching enabled");
    Ok(())
}

/// `sync`: debounced pass for whatever mode is active. Entry point for
/// external triggers that fire alongside the desktop's own switch.
pub fn sync(session: &Session, settings: &Settings, now: SystemTime) -> Result<Option<ApplyReport>> {
    session.settle();
    let Some(mode) = session.active_mode(settings)? else {
        return Ok(None);
    };
    if !session.guard().should_apply(TriggerSource::Sync, now) {
        return Ok(None);
    }
    Ok(Some(session.engine.apply(
        session.desktop,
        settings,
        mode,
        ApplyOrigin::PackageSwitch,
    )))
}

/// `reapply`: every domain, bundled ones included, no debounce
pub fn reapply(session: &Session, settings: &Settings, mode: Option<Mode>) -> Result<ApplyReport> {
    let mode = match mode {
        Some(mode) => mode,
        None => session
            .active_mode(settings)?
            .context("Active package is not a configured one; pass light or dark")?,
    };
    if mode == Mode::Auto {
        bail!("Only light or dark can be re-applied");
    }
    Ok(session.engine.apply(session.desktop, settings, mode, ApplyOrigin::Full))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub automatic: bool,
    pub active_package: String,
    pub mode: Option<Mode>,
    pub last_applied: Option<Mode>,
    pub watcher_running: bool,
    pub custom_themes: bool,
    /// Source of the last permitted apply
    pub last_trigger: Option<String>,
}

impl StatusReport {
    pub fn render(&self) -> String {
        let mode = |m: Option<Mode>| m.map_or("unknown", Mode::as_str);
        format!(
            "automatic:      {}\nactive package: {}\nmode:           {}\nlast applied:   {}\nlast trigger:   {}\nwatcher:        {}\ncustom themes:  {}\n",
            if self.automatic { "on" } else { "off" },
            self.active_package,
            mode(self.mode),
            mode(self.last_applied),
            self.last_trigger.as_deref().unwrap_or("none"),
            if self.watcher_running { "running" } else { "stopped" },
            if self.custom_themes { "yes" } else { "no" },
        )
    }
}

pub fn status(desktop: &dyn Desktop, settings: &Settings, runtime: &RuntimePaths) -> Result<StatusReport> {
    let active_package = desktop.active_theme_package()?;
    Ok(StatusReport {
        automatic: desktop.automatic_enabled()?,
        mode: ModeResolver::new(&settings.laf).resolve(&active_package),
        active_package,
        last_applied: StatusFile::new(runtime.status()).read(),
        watcher_running: watcher_running(&runtime.watcher_pid()),
        custom_themes: settings.custom_themes_active(),
        last_trigger: DebounceGuard::new(runtime.debounce_marker(), timing::DEBOUNCE_WINDOW)
            .read()
            .map(|marker| marker.source),
    })
}

#[derive(Debug, Clone, Default)]
pub struct ForgeOptions {
    pub base_light: Option<String>,
    pub base_dark: Option<String>,
    pub layout: Option<PathBuf>,
}

impl ForgeOptions {
    fn base(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Light => self.base_light.as_deref(),
            Mode::Dark => self.base_dark.as_deref(),
            Mode::Auto => None,
        }
    }
}

/// Result of `forge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forged {
    /// Updated settings, already saved
    pub settings: Settings,
    /// A watcher started before the package ids changed still resolves the old ones
    pub restart_watcher: bool,
}

/// `forge`: generate (or regenerate) both custom packages and switch the
/// settings over to them
pub fn forge(
    desktop: &dyn Desktop,
    store: &ConfigStore,
    runtime: &RuntimePaths,
    settings: &Settings,
    forge: &ThemeForge,
    options: &ForgeOptions,
) -> Result<Forged> {
    let active_mode = desktop
        .active_theme_package()
        .ok()
        .and_then(|active| ModeResolver::new(&settings.laf).resolve(&active));

    let mut ids = Vec::with_capacity(2);
    let mut bases = Vec::with_capacity(2);
    for mode in [Mode::Light, Mode::Dark] {
        let overrides = ForgeOverrides::from_settings(settings, mode).with_layout(options.layout.clone());
        let configured = settings.laf.get(mode).unwrap_or_default();
        let artifact = match options.base(mode) {
            Some(base) => forge.fork(base, mode, &overrides)?,
            None if settings.base_theme.is_none()
                && normalize_package_id(configured) != ThemeForge::custom_id(mode) =>
            {
                forge.fork(configured, mode, &overrides)?
            }
            None => forge.regenerate(settings, mode, &overrides)?,
        };
        info!(mode = %mode, id = %artifact.id, base = %artifact.base, "Theme package ready");
        ids.push(artifact.id);
        bases.push(artifact.base);
    }

    let mut updated = settings.clone();
    updated.laf = ThemePair::new(ids[0].clone(), ids[1].clone());
    updated.custom_theme = Some(updated.laf.clone());
    updated.base_theme = Some(ThemePair::new(bases[0].clone(), bases[1].clone()));
    store.save(&updated)?;

    if let Some(package) = active_mode.and_then(|mode| updated.laf.get(mode)) {
        desktop
            .apply_theme_package(package)
            .context(format!("Failed to switch to {package}"))?;
    }

    let restart_watcher = updated.laf != settings.laf && watcher_running(&runtime.watcher_pid());
    if restart_watcher {
        warn!("Watcher still has the previous package ids, restart it to follow the new packages");
    }
    Ok(Forged {
        settings: updated,
        restart_watcher,
    })
}
