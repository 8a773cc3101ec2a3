//! Theme package generation
//!
//! `ThemeForge` forks an installed look-and-feel package into a package of
//! our own and folds the user's bundleable choices (colors, icons, cursor,
//! desktop style, window decoration, splash) into its `contents/defaults`.
//! Plasma then applies them natively when it switches to the fork. Every
//! step can be re-run: the fork is recreated from the base each time.

pub mod ini;
pub mod metadata;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::apply::appliers::split_decoration;
use crate::apply::Domain;
use crate::config::{InstallScope, Settings};
use crate::constants::{forge, paths};
use crate::mode::{normalize_package_id, Mode};

use metadata::Identity;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("base theme package '{0}' is not installed; run the setup again to pick another one")]
    BaseMissing(String),

    #[error("generated package for {0} mode has no recorded base package; run the setup again")]
    MissingBaseReference(Mode),

    #[error("theme packages can only be generated for light or dark, not {0}")]
    InvalidMode(Mode),

    #[error("refusing to replace package '{0}' with a fork of itself")]
    SameIdentity(String),

    #[error("package at {} has neither metadata.json nor metadata.desktop", .0.display())]
    MetadataMissing(PathBuf),

    #[error("unexpected metadata layout in {}", .0.display())]
    MetadataShape(PathBuf),

    #[error("invalid package metadata in {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(context: String) -> impl FnOnce(std::io::Error) -> ForgeError {
    move |source| ForgeError::Io { context, source }
}

/// Values folded into a generated package, plus an optional layout script
#[derive(Debug, Clone, Default)]
pub struct ForgeOverrides {
    values: Vec<(Domain, String)>,
    pub layout: Option<PathBuf>,
}

impl ForgeOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only bundled domains are kept; empty values leave the base's setting alone
    pub fn with(mut self, domain: Domain, value: impl Into<String>) -> Self {
        let value = value.into();
        if domain.is_bundled() && !value.is_empty() {
            self.values.retain(|(d, _)| *d != domain);
            self.values.push((domain, value));
        } else if !domain.is_bundled() {
            debug!(domain = %domain, "Domain cannot be bundled, ignoring override");
        }
        self
    }

    pub fn with_layout(mut self, layout: Option<PathBuf>) -> Self {
        self.layout = layout;
        self
    }

    /// Bundleable values the settings hold for `mode`
    pub fn from_settings(settings: &Settings, mode: Mode) -> Self {
        Domain::APPLY_ORDER
            .into_iter()
            .filter(|d| d.is_bundled())
            .fold(Self::new(), |overrides, domain| match settings.value_for(domain, mode) {
                Some(value) => overrides.with(domain, value),
                None => overrides,
            })
    }

    pub fn get(&self, domain: Domain) -> Option<&str> {
        self.values
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, v)| v.as_str())
    }
}

/// `(section, key, value)` lines a domain value becomes in `contents/defaults`
fn defaults_entries(domain: Domain, value: &str) -> Vec<(&'static str, &'static str, String)> {
    match domain {
        Domain::ColorScheme => vec![("[kdeglobals][General]", "ColorScheme", value.to_string())],
        Domain::Icons => vec![("[kdeglobals][Icons]", "Theme", value.to_string())],
        Domain::Cursor => vec![("[kcminputrc][Mouse]", "cursorTheme", value.to_string())],
        Domain::DesktopStyle => vec![("[plasmarc][Theme]", "name", value.to_string())],
        Domain::Decoration => {
            let (library, theme) = split_decoration(value);
            vec![
                ("[kwinrc][org.kde.kdecoration2]", "library", library.to_string()),
                ("[kwinrc][org.kde.kdecoration2]", "theme", theme.unwrap_or("").to_string()),
            ]
        }
        Domain::Splash => {
            let engine = if value == forge::SPLASH_DISABLED { "none" } else { "KSplashQML" };
            vec![
                ("[ksplashrc][KSplash]", "Engine", engine.to_string()),
                ("[ksplashrc][KSplash]", "Theme", value.to_string()),
            ]
        }
        _ => Vec::new(),
    }
}

/// A generated package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomThemeArtifact {
    pub id: String,
    pub mode: Mode,
    pub path: PathBuf,
    /// Package this one was forked from
    pub base: String,
}

impl CustomThemeArtifact {
    /// Inspect an existing generated package. One without a recorded base
    /// cannot be regenerated.
    pub fn load(path: &Path, mode: Mode) -> Result<Self, ForgeError> {
        let base = metadata::read_base_reference(path)?.ok_or(ForgeError::MissingBaseReference(mode))?;
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            id,
            mode,
            path: path.to_path_buf(),
            base,
        })
    }
}

pub struct ThemeForge {
    search_dirs: Vec<PathBuf>,
    output_root: PathBuf,
}

impl ThemeForge {
    pub fn new(search_dirs: Vec<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            search_dirs,
            output_root: output_root.into(),
        }
    }

    /// User packages shadow system ones; output goes where the scope says
    pub fn for_scope(scope: InstallScope) -> Self {
        let user_root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(paths::USER_LAF_SUBDIR);
        let system_root = PathBuf::from(paths::SYSTEM_LAF_DIR);
        let output_root = match scope {
            InstallScope::User => user_root.clone(),
            InstallScope::System => system_root.clone(),
        };
        Self::new(vec![user_root, system_root], output_root)
    }

    pub fn custom_id(mode: Mode) -> String {
        format!("{}.{}", forge::CUSTOM_ID_PREFIX, mode)
    }

    pub fn output_path(&self, mode: Mode) -> PathBuf {
        self.output_root.join(Self::custom_id(mode))
    }

    /// Directory of an installed package; `org.kde.breeze` also finds
    /// `org.kde.breeze.desktop`
    pub fn locate(&self, id: &str) -> Option<PathBuf> {
        let id = id.trim();
        let candidates = [id.to_string(), format!("{}.desktop", normalize_package_id(id))];
        self.search_dirs.iter().find_map(|root| {
            candidates
                .iter()
                .map(|name| root.join(name))
                .find(|dir| dir.is_dir())
        })
    }

    /// Fork `base_id` into the generated package for `mode`
    pub fn fork(
        &self,
        base_id: &str,
        mode: Mode,
        overrides: &ForgeOverrides,
    ) -> Result<CustomThemeArtifact, ForgeError> {
        if mode == Mode::Auto {
            return Err(ForgeError::InvalidMode(mode));
        }
        let id = Self::custom_id(mode);
        if normalize_package_id(base_id) == id {
            return Err(ForgeError::SameIdentity(id));
        }

        let base_dir = self
            .locate(base_id)
            .ok_or_else(|| ForgeError::BaseMissing(base_id.to_string()))?;
        let target = self.output_path(mode);
        info!(base = %base_id, id = %id, path = %target.display(), "Generating theme package");

        if target.exists() {
            fs::remove_dir_all(&target)
                .map_err(io_error(format!("Failed to remove previous {}", target.display())))?;
        }
        copy_tree(&base_dir, &target)?;

        let base_name = metadata::read_name(&base_dir).unwrap_or_else(|| base_id.to_string());
        let identity = Identity {
            id: id.clone(),
            name: match mode {
                Mode::Dark => "Custom Dark".to_string(),
                _ => "Custom Light".to_string(),
            },
            description: format!("Generated from {base_name}"),
            base: base_id.to_string(),
        };
        metadata::rewrite(&target, &identity)?;

        patch_defaults(&target, overrides)?;

        if overrides.get(Domain::Splash) == Some(forge::SPLASH_DISABLED) {
            let splash = target.join(forge::SPLASH_DIR);
            if splash.exists() {
                fs::remove_dir_all(&splash)
                    .map_err(io_error(format!("Failed to remove {}", splash.display())))?;
                debug!(path = %splash.display(), "Removed bundled splash");
            }
        }

        if let Some(layout) = &overrides.layout {
            let dest = target.join(forge::LAYOUT_FILE);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(io_error(format!("Failed to create {}", parent.display())))?;
            }
            fs::copy(layout, &dest)
                .map_err(io_error(format!("Failed to copy layout {}", layout.display())))?;
            debug!(layout = %layout.display(), "Bundled panel layout");
        }

        Ok(CustomThemeArtifact {
            id,
            mode,
            path: target,
            base: base_id.to_string(),
        })
    }

    /// Re-create the generated package for `mode` from its recorded base.
    /// The base comes from the settings, else from the existing package.
    pub fn regenerate(
        &self,
        settings: &Settings,
        mode: Mode,
        overrides: &ForgeOverrides,
    ) -> Result<CustomThemeArtifact, ForgeError> {
        let from_settings = settings
            .base_theme
            .as_ref()
            .and_then(|pair| pair.get(mode))
            .map(str::to_string);
        let base = match from_settings {
            Some(base) => base,
            None => CustomThemeArtifact::load(&self.output_path(mode), mode)?.base,
        };
        self.fork(&base, mode, overrides)
    }
}

fn patch_defaults(package: &Path, overrides: &ForgeOverrides) -> Result<(), ForgeError> {
    let path = package.join(forge::DEFAULTS_FILE);
    let original = if path.is_file() {
        fs::read_to_string(&path).map_err(io_error(format!("Failed to read {}", path.display())))?
    } else {
        String::new()
    };

    let mut doc = original.clone();
    for domain in Domain::APPLY_ORDER {
        let Some(value) = overrides.get(domain) else {
            continue;
        };
        for (section, key, value) in defaults_entries(domain, value) {
            doc = ini::upsert(&doc, section, key, &value);
        }
    }

    if doc != original {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(format!("Failed to create {}", parent.display())))?;
        }
        fs::write(&path, doc).map_err(io_error(format!("Failed to write {}", path.display())))?;
        debug!(path = %path.display(), "Patched package defaults");
    }
    Ok(())
}

/// Recursive copy; symlinks are recreated, not followed
fn copy_tree(from: &Path, to: &Path) -> Result<(), ForgeError> {
    fs::create_dir_all(to).map_err(io_error(format!("Failed to create {}", to.display())))?;
    let entries = fs::read_dir(from).map_err(io_error(format!("Failed to read {}", from.display())))?;
    for entry in entries {
        let entry = entry.map_err(io_error(format!("Failed to read {}", from.display())))?;
        let source = entry.path();
        let dest = to.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(io_error(format!("Failed to stat {}", source.display())))?;

        if file_type.is_dir() {
            copy_tree(&source, &dest)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(&source)
                .map_err(io_error(format!("Failed to read link {}", source.display())))?;
            std::os::unix::fs::symlink(&link, &dest)
                .map_err(io_error(format!("Failed to link {}", dest.display())))?;
        } else {
            fs::copy(&source, &dest).map_err(io_error(format!("Failed to copy {}", source.display())))?;
        }
    }
    Ok(())
}
