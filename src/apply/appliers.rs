//! Plasma bindings for each domain
//!
//! Every applier is a thin wrapper over one or two desktop tools and is
//! allowed to fail on its own; the engine isolates the failure.

use anyhow::{bail, Context, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::apply::{Applier, Domain, Outcome};
use crate::constants::{forge, paths, tools};
use crate::desktop::command::{run_command, run_tool};

/// The Plasma applier table, one entry per domain
pub fn plasma_appliers() -> Vec<Box<dyn Applier>> {
    vec![
        Box::new(ToolApplier::new(Domain::StyleEngine, tools::KVANTUMMANAGER, &["--set"])),
        Box::new(ToolApplier::new(Domain::DesktopStyle, tools::APPLY_DESKTOPTHEME, &[])),
        Box::new(ToolApplier::new(Domain::ColorScheme, tools::APPLY_COLORSCHEME, &[])),
        Box::new(IconApplier),
        Box::new(ToolApplier::new(Domain::Cursor, tools::APPLY_CURSORTHEME, &[])),
        Box::new(DecorationApplier),
        Box::new(TerminalProfileApplier),
        Box::new(SplashApplier),
        Box::new(GtkApplier),
        Box::new(BrowserHintApplier),
        Box::new(ScriptApplier),
    ]
}

fn kwriteconfig(file: &str, group: &str, key: &str, value: &str) -> Result<()> {
    run_tool(
        tools::KWRITECONFIG,
        &["--file", file, "--group", group, "--key", key, value],
    )?;
    Ok(())
}

/// `<program> [fixed args...] <value>`
struct ToolApplier {
    domain: Domain,
    program: &'static str,
    leading_args: &'static [&'static str],
}

impl ToolApplier {
    fn new(domain: Domain, program: &'static str, leading_args: &'static [&'static str]) -> Self {
        Self {
            domain,
            program,
            leading_args,
        }
    }
}

impl Applier for ToolApplier {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        let mut args: Vec<&str> = self.leading_args.to_vec();
        args.push(value);
        run_tool(self.program, &args)?;
        Ok(Outcome::Applied)
    }
}

/// `plasma-changeicons` ships in libexec, which is not on PATH
struct IconApplier;

impl IconApplier {
    fn locate() -> Option<PathBuf> {
        paths::LIBEXEC_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(tools::CHANGEICONS))
            .find(|candidate| candidate.is_file())
    }
}

impl Applier for IconApplier {
    fn domain(&self) -> Domain {
        Domain::Icons
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        let Some(program) = Self::locate() else {
            bail!("{} not found in {:?}", tools::CHANGEICONS, paths::LIBEXEC_DIRS);
        };
        let mut command = Command::new(program);
        command.arg(value);
        run_command(command)?;
        Ok(Outcome::Applied)
    }
}

/// Decoration values are `library` or `library|theme`
/// (e.g. `org.kde.kwin.aurorae|__aurorae__svg__Sweet-Dark`)
pub fn split_decoration(value: &str) -> (&str, Option<&str>) {
    match value.split_once('|') {
        Some((library, theme)) if !theme.is_empty() => (library, Some(theme)),
        Some((library, _)) => (library, None),
        None => (value, None),
    }
}

struct DecorationApplier;

impl Applier for DecorationApplier {
    fn domain(&self) -> Domain {
        Domain::Decoration
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        let (library, theme) = split_decoration(value);
        kwriteconfig("kwinrc", "org.kde.kdecoration2", "library", library)?;
        kwriteconfig("kwinrc", "org.kde.kdecoration2", "theme", theme.unwrap_or(""))?;
        run_tool(tools::QDBUS, &["org.kde.KWin", "/KWin", "reconfigure"])
            .context("KWin did not reload its decoration")?;
        Ok(Outcome::Applied)
    }
}

pub fn konsole_profile_file(value: &str) -> String {
    if value.ends_with(".profile") {
        value.to_string()
    } else {
        format!("{value}.profile")
    }
}

struct TerminalProfileApplier;

impl Applier for TerminalProfileApplier {
    fn domain(&self) -> Domain {
        Domain::TerminalProfile
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        kwriteconfig("konsolerc", "Desktop Entry", "DefaultProfile", &konsole_profile_file(value))?;
        Ok(Outcome::Applied)
    }
}

struct SplashApplier;

impl Applier for SplashApplier {
    fn domain(&self) -> Domain {
        Domain::Splash
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        let engine = if value == forge::SPLASH_DISABLED { "none" } else { "KSplashQML" };
        kwriteconfig("ksplashrc", "KSplash", "Engine", engine)?;
        kwriteconfig("ksplashrc", "KSplash", "Theme", value)?;
        Ok(Outcome::Applied)
    }
}

/// Goes through the kde-gtk-config daemon so running GTK apps follow
struct GtkApplier;

impl Applier for GtkApplier {
    fn domain(&self) -> Domain {
        Domain::Gtk
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        let theme = format!("string:{value}");
        run_tool(
            tools::DBUS_SEND,
            &[
                "--session",
                "--type=method_call",
                "--dest=org.kde.GtkConfig",
                "/GtkConfig",
                "org.kde.GtkConfig.setGtkTheme",
                theme.as_str(),
            ],
        )?;
        Ok(Outcome::Applied)
    }
}

struct BrowserHintApplier;

impl Applier for BrowserHintApplier {
    fn domain(&self) -> Domain {
        Domain::BrowserHint
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        run_tool(
            tools::GSETTINGS,
            &["set", "org.gnome.desktop.interface", "color-scheme", value],
        )?;
        Ok(Outcome::Applied)
    }
}

pub fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

struct ScriptApplier;

impl Applier for ScriptApplier {
    fn domain(&self) -> Domain {
        Domain::Script
    }

    fn apply(&self, value: &str) -> Result<Outcome> {
        let script = expand_home(value);
        if !is_executable(&script) {
            return Ok(Outcome::Skipped(format!(
                "{} is missing or not executable",
                script.display()
            )));
        }
        debug!(script = %script.display(), "Running user script");
        run_command(Command::new(&script))?;
        Ok(Outcome::Applied)
    }
}
