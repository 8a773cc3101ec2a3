#![forbid(unsafe_code)]

mod apply;
mod commands;
mod config;
mod constants;
mod desktop;
mod forge;
mod logging;
mod mode;
mod monitor;
mod runtime;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info};

use apply::{ApplyEngine, ApplyReport};
use commands::{ForgeOptions, Session};
use config::{ConfigStore, Settings};
use constants::timing;
use desktop::PlasmaDesktop;
use forge::ThemeForge;
use mode::Mode;
use runtime::{RuntimePaths, StatusFile};

/// Keeps application styles, icons, cursors and terminal profiles in step
/// with Plasma's light/dark theme package
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow theme package switches until stopped (run by the session's service manager)
    Watch,
    /// Switch to the light package and apply it everywhere
    Light,
    /// Switch to the dark package and apply it everywhere
    Dark,
    /// Switch to the other mode
    Toggle,
    /// Hand light/dark selection back to Plasma's day/night schedule
    Auto,
    /// Apply the active mode unless it was applied moments ago
    Sync,
    /// Apply every domain again, including those bundled into theme packages
    Reapply {
        /// light or dark; defaults to the active mode
        mode: Option<Mode>,
    },
    /// Show the current state
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Generate custom theme packages with the configured values bundled in.
    /// A running watcher must be restarted afterwards to follow the new packages.
    Forge {
        /// Package to fork for light mode
        #[arg(long)]
        base_light: Option<String>,

        /// Package to fork for dark mode
        #[arg(long)]
        base_dark: Option<String>,

        /// Panel layout script to bundle
        #[arg(long)]
        layout: Option<PathBuf>,
    },
}

fn print_report(report: Option<ApplyReport>) {
    let Some(report) = report else {
        println!("No apply pass needed");
        return;
    };
    println!(
        "Applied {} ({} domains, {} skipped, {} failed)",
        report.mode,
        report.applied.len(),
        report.skipped.len(),
        report.failed.len()
    );
    if !report.is_clean() {
        for (domain, reason) in &report.failed {
            println!("  {domain}: {reason}");
        }
    }
}

fn run(command: Command) -> Result<()> {
    let desktop = PlasmaDesktop::new();
    match command {
        Command::Auto => commands::auto(&desktop),
        command => run_configured(command, &desktop),
    }
}

/// Commands that need the settings record
fn run_configured(command: Command, desktop: &PlasmaDesktop) -> Result<()> {
    let store = ConfigStore::open_default();
    let settings: Settings = store.load()?;
    let runtime = RuntimePaths::from_env()?;
    let engine = ApplyEngine::plasma(StatusFile::new(runtime.status()));
    let mut session = Session {
        desktop,
        engine: &engine,
        runtime: &runtime,
        settle: timing::FORCE_SETTLE_DELAY,
    };

    match command {
        Command::Watch => {
            let shutdown = Arc::new(AtomicBool::new(false));
            for signal in [SIGTERM, SIGINT] {
                signal_hook::flag::register(signal, Arc::clone(&shutdown))
                    .context(format!("Failed to register handler for signal {signal}"))?;
            }
            session.settle = timing::WATCH_SETTLE_DELAY;
            info!(version = env!("CARGO_PKG_VERSION"), "Starting watcher");
            commands::watch(&session, &settings, &PlasmaDesktop::kdeglobals_path(), &shutdown)?;
        }
        Command::Light => print_report(commands::force(&session, &settings, Mode::Light, SystemTime::now())?),
        Command::Dark => print_report(commands::force(&session, &settings, Mode::Dark, SystemTime::now())?),
        Command::Toggle => print_report(commands::toggle(&session, &settings, SystemTime::now())?),
        Command::Sync => {
            session.settle = timing::WATCH_SETTLE_DELAY;
            print_report(commands::sync(&session, &settings, SystemTime::now())?)
        }
        Command::Reapply { mode } => print_report(Some(commands::reapply(&session, &settings, mode)?)),
        Command::Status { json } => {
            let report = commands::status(desktop, &settings, &runtime)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render());
            }
        }
        Command::Forge {
            base_light,
            base_dark,
            layout,
        } => {
            let options = ForgeOptions {
                base_light,
                base_dark,
                layout,
            };
            let theme_forge = ThemeForge::for_scope(settings.install_scope);
            let forged = commands::forge(desktop, &store, &runtime, &settings, &theme_forge, &options)?;
            println!("Light: {}\nDark:  {}", forged.settings.laf.light, forged.settings.laf.dark);
            println!("Settings saved to {}", store.path().display());
            if forged.restart_watcher {
                println!("Restart the watcher service so it follows the new packages");
            }
        }
        Command::Auto => commands::auto(desktop)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging_ready = match logging::init() {
        Ok(_) => true,
        Err(e) => {
            eprintln!("{e:#}");
            false
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if logging_ready {
                error!(error = %format!("{e:#}"), "Fatal");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
