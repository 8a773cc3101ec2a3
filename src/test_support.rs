//! Fakes shared by unit tests

use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::apply::{Applier, Domain, Outcome};
use crate::desktop::Desktop;

/// Calls seen by `RecordingApplier`s, in invocation order
#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<(Domain, String)>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<(Domain, String)> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Number of complete passes, counted by browser-hint calls (always configured)
    pub fn passes(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|(d, _)| *d == Domain::BrowserHint)
            .count()
    }
}

enum Behavior {
    Apply,
    Fail,
    Skip,
}

pub struct RecordingApplier {
    domain: Domain,
    log: CallLog,
    behavior: Behavior,
}

impl RecordingApplier {
    /// One recording applier per domain; those in `failing` return an error
    pub fn table(failing: &[Domain]) -> (Vec<Box<dyn Applier>>, CallLog) {
        let log = CallLog::default();
        let appliers = Domain::APPLY_ORDER
            .into_iter()
            .map(|domain| {
                let behavior = if failing.contains(&domain) { Behavior::Fail } else { Behavior::Apply };
                Box::new(RecordingApplier {
                    domain,
                    log: log.clone(),
                    behavior,
                }) as Box<dyn Applier>
            })
            .collect();
        (appliers, log)
    }

    pub fn skipping(domain: Domain, log: CallLog) -> Self {
        Self {
            domain,
            log,
            behavior: Behavior::Skip,
        }
    }
}

impl Applier for RecordingApplier {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        self.log.0.borrow_mut().push((self.domain, value.to_string()));
        match self.behavior {
            Behavior::Apply => Ok(Outcome::Applied),
            Behavior::Fail => Err(anyhow!("{} exploded", self.domain)),
            Behavior::Skip => Ok(Outcome::Skipped("not executable".to_string())),
        }
    }
}

pub struct FakeDesktop {
    active: RefCell<String>,
    automatic: Cell<bool>,
    refreshes: Cell<usize>,
    applied_packages: RefCell<Vec<String>>,
}

impl FakeDesktop {
    pub fn new(active: &str) -> Self {
        Self {
            active: RefCell::new(active.to_string()),
            automatic: Cell::new(false),
            refreshes: Cell::new(0),
            applied_packages: RefCell::new(Vec::new()),
        }
    }

    pub fn set_active(&self, id: &str) {
        *self.active.borrow_mut() = id.to_string();
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.get()
    }

    pub fn applied_packages(&self) -> Vec<String> {
        self.applied_packages.borrow().clone()
    }

    pub fn automatic(&self) -> bool {
        self.automatic.get()
    }
}

impl Desktop for FakeDesktop {
    fn active_theme_package(&self) -> Result<String> {
        Ok(self.active.borrow().clone())
    }

    fn automatic_enabled(&self) -> Result<bool> {
        Ok(self.automatic.get())
    }

    fn set_automatic(&self, enabled: bool) -> Result<()> {
        self.automatic.set(enabled);
        Ok(())
    }

    fn apply_theme_package(&self, id: &str) -> Result<()> {
        self.applied_packages.borrow_mut().push(id.to_string());
        self.set_active(id);
        Ok(())
    }

    fn refresh_clients(&self) -> Result<()> {
        self.refreshes.set(self.refreshes.get() + 1);
        Ok(())
    }
}
