//! Logical appearance mode and its resolution from the active theme package

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::ThemePair;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Light,
    Dark,
    /// Light/dark selection is left to the desktop's own day/night scheduler
    Auto,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Light => "light",
            Mode::Dark => "dark",
            Mode::Auto => "auto",
        }
    }

    /// Light ↔ Dark; `Auto` has no opposite and stays `Auto`
    pub fn opposite(self) -> Mode {
        match self {
            Mode::Light => Mode::Dark,
            Mode::Dark => Mode::Light,
            Mode::Auto => Mode::Auto,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Mode::Light),
            "dark" => Ok(Mode::Dark),
            "auto" => Ok(Mode::Auto),
            other => Err(format!("unknown mode '{other}' (expected light, dark or auto)")),
        }
    }
}

/// Package ids are compared without Plasma's optional `.desktop` suffix
pub fn normalize_package_id(id: &str) -> &str {
    let id = id.trim();
    id.strip_suffix(".desktop").unwrap_or(id)
}

/// Maps the desktop's active package id onto Light or Dark
pub struct ModeResolver<'a> {
    packages: &'a ThemePair,
}

impl<'a> ModeResolver<'a> {
    pub fn new(packages: &'a ThemePair) -> Self {
        Self { packages }
    }

    /// `None` when the active package is neither configured package, e.g. a
    /// transient or third-party selection. Callers treat that as "do nothing".
    pub fn resolve(&self, active: &str) -> Option<Mode> {
        let active_norm = normalize_package_id(active);
        let mode = if active_norm == normalize_package_id(&self.packages.light) {
            Some(Mode::Light)
        } else if active_norm == normalize_package_id(&self.packages.dark) {
            Some(Mode::Dark)
        } else {
            None
        };

        match mode {
            Some(mode) => debug!(active = %active, mode = %mode, "Resolved active package"),
            None => info!(
                active = %active,
                light = %self.packages.light,
                dark = %self.packages.dark,
                "Active package matches neither configured package, ignoring"
            ),
        }
        mode
    }
}
