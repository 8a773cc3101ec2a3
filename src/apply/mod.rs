//! The apply pass: push one mode to every configured domain
//!
//! The pass walks a fixed table of appliers in domain order. A failing
//! domain is logged and the pass moves on; nothing is rolled back. After the
//! last domain the last-applied mode is recorded and clients are told to
//! refresh.

pub mod appliers;
pub mod domain;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::desktop::Desktop;
use crate::mode::Mode;
use crate::runtime::StatusFile;

pub use domain::Domain;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Deliberately not applied; logged, not a failure
    Skipped(String),
}

/// One row of the apply table
pub trait Applier {
    fn domain(&self) -> Domain;

    fn apply(&self, value: &str) -> Result<Outcome>;
}

/// What caused the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOrigin {
    /// The desktop switched packages (by itself or on our request). With
    /// generated packages in use it already applied the bundled domains.
    PackageSwitch,
    /// Explicit full re-apply of every domain
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub mode: Mode,
    pub applied: Vec<Domain>,
    pub skipped: Vec<(Domain, String)>,
    pub failed: Vec<(Domain, String)>,
}

impl ApplyReport {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ApplyEngine {
    appliers: Vec<Box<dyn Applier>>,
    status: StatusFile,
}

impl ApplyEngine {
    /// The table is kept in domain order whatever order it is given in
    pub fn new(mut appliers: Vec<Box<dyn Applier>>, status: StatusFile) -> Self {
        appliers.sort_by_key(|a| a.domain());
        Self { appliers, status }
    }

    pub fn plasma(status: StatusFile) -> Self {
        Self::new(appliers::plasma_appliers(), status)
    }

    pub fn status(&self) -> &StatusFile {
        &self.status
    }

    /// Run one pass. Only `Light` and `Dark` can be applied.
    pub fn apply(
        &self,
        desktop: &dyn Desktop,
        settings: &Settings,
        mode: Mode,
        origin: ApplyOrigin,
    ) -> ApplyReport {
        let mut report = ApplyReport::new(mode);
        if mode == Mode::Auto {
            warn!("Auto is not an applicable mode, nothing to do");
            return report;
        }

        let skip_bundled = origin == ApplyOrigin::PackageSwitch && settings.custom_themes_active();
        info!(mode = %mode, origin = ?origin, skip_bundled = skip_bundled, "Applying mode");

        for applier in &self.appliers {
            let domain = applier.domain();
            let Some(value) = settings.value_for(domain, mode) else {
                continue;
            };
            if skip_bundled && domain.is_bundled() {
                report
                    .skipped
                    .push((domain, "applied by the theme package".to_string()));
                continue;
            }

            match applier.apply(&value) {
                Ok(Outcome::Applied) => {
                    info!(domain = %domain, value = %value, "Applied");
                    report.applied.push(domain);
                }
                Ok(Outcome::Skipped(reason)) => {
                    warn!(domain = %domain, value = %value, reason = %reason, "Skipped");
                    report.skipped.push((domain, reason));
                }
                Err(e) => {
                    error!(domain = %domain, value = %value, error = %format!("{e:#}"), "Failed to apply");
                    report.failed.push((domain, format!("{e:#}")));
                }
            }
        }

        if let Err(e) = self.status.write(mode) {
            error!(path = %self.status.path().display(), error = %format!("{e:#}"), "Failed to record applied mode");
        }
        if let Err(e) = desktop.refresh_clients() {
            error!(error = %format!("{e:#}"), "Failed to refresh clients");
        }

        info!(
            mode = %mode,
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Apply pass finished"
        );
        report
    }
}
