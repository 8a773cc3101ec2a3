//! The desktop environment as seen by the synchronizer
//!
//! `Desktop` is the seam between the sync logic and Plasma: which package is
//! active, the automatic day/night flag, switching packages and the
//! style-refresh broadcast. `PlasmaDesktop` is the real binding.

pub mod command;
pub mod watch;

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::constants::{kde, paths, tools};
use crate::forge::ini;

pub use command::run_tool;

pub trait Desktop {
    /// Id of the currently active look-and-feel package
    fn active_theme_package(&self) -> Result<String>;

    /// Whether the desktop's own day/night scheduler is switching packages
    fn automatic_enabled(&self) -> Result<bool>;

    fn set_automatic(&self, enabled: bool) -> Result<()>;

    /// Ask the desktop to switch to (and apply) a package
    fn apply_theme_package(&self, id: &str) -> Result<()>;

    /// Tell every style-aware client to reload its appearance
    fn refresh_clients(&self) -> Result<()>;
}

pub struct PlasmaDesktop {
    kdeglobals: PathBuf,
}

impl PlasmaDesktop {
    pub fn new() -> Self {
        Self {
            kdeglobals: Self::kdeglobals_path(),
        }
    }

    /// The file Plasma rewrites when the package changes; this is what `watch` observes
    pub fn kdeglobals_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::KDEGLOBALS);
        path
    }

    fn read_kdeglobals(&self) -> Result<String> {
        match fs::read_to_string(&self.kdeglobals) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).context(format!("Failed to read {}", self.kdeglobals.display())),
        }
    }
}

impl Default for PlasmaDesktop {
    fn default() -> Self {
        Self::new()
    }
}

impl Desktop for PlasmaDesktop {
    fn active_theme_package(&self) -> Result<String> {
        let contents = self.read_kdeglobals()?;
        let id = ini::get(&contents, kde::KDE_GROUP, kde::LAF_KEY)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| kde::DEFAULT_LAF.to_string());
        debug!(package = %id, "Read active theme package");
        Ok(id)
    }

    fn automatic_enabled(&self) -> Result<bool> {
        let contents = self.read_kdeglobals()?;
        Ok(ini::get(&contents, kde::KDE_GROUP, kde::AUTOMATIC_KEY)
            .is_some_and(|v| v.eq_ignore_ascii_case("true")))
    }

    fn set_automatic(&self, enabled: bool) -> Result<()> {
        let value = if enabled { "true" } else { "false" };
        run_tool(
            tools::KWRITECONFIG,
            &[
                "--file",
                paths::KDEGLOBALS,
                "--group",
                "KDE",
                "--key",
                kde::AUTOMATIC_KEY,
                "--type",
                "bool",
                value,
            ],
        )
        .context("Failed to change automatic day/night switching")?;
        info!(enabled = enabled, "Automatic day/night switching updated");
        Ok(())
    }

    fn apply_theme_package(&self, id: &str) -> Result<()> {
        run_tool(tools::APPLY_LOOKANDFEEL, &["-a", id])
            .context(format!("Failed to apply theme package '{id}'"))?;
        info!(package = %id, "Theme package applied");
        Ok(())
    }

    fn refresh_clients(&self) -> Result<()> {
        run_tool(
            tools::DBUS_SEND,
            &[
                "--session",
                "--type=signal",
                "/KGlobalSettings",
                "org.kde.KGlobalSettings.notifyChange",
                "int32:2",
                "int32:0",
            ],
        )
        .context("Failed to broadcast style refresh")?;
        debug!("Style refresh broadcast sent");
        Ok(())
    }
}
