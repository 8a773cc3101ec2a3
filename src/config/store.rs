//! Persistence of the settings record
//!
//! The record is a flat `KEY=value` file that shell tooling can also source,
//! so values may be quoted either way on read and are written double-quoted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ConfigError, Settings};
use crate::constants::paths;

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$XDG_CONFIG_HOME/plasma-daynight-sync/config`
    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::CONFIG_FILENAME);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings, ConfigError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::Missing(self.path.clone()));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let settings = Settings::from_entries(parse_record(&contents))?;
        debug!(path = %self.path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Validates, then replaces the file through a temporary sibling
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, render_record(&settings.to_entries())).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        info!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}

/// Parse `KEY=value` lines; comments, blank lines and malformed lines are skipped
pub fn parse_record(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return None;
            }
            Some((key.to_string(), unquote(value.trim())))
        })
        .collect()
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return value[1..value.len() - 1].to_string();
    }
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        let inner = &value[1..value.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(next @ ('"' | '\\' | '$' | '`')) => out.push(next),
                    Some(next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        return out;
    }
    value.to_string()
}

pub fn render_record(entries: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(key);
        out.push_str("=\"");
        for c in value.chars() {
            if matches!(c, '"' | '\\' | '$' | '`') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push_str("\"\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::Domain;
    use crate::config::ThemePair;
    use crate::mode::Mode;

    #[test]
    fn test_parse_record_quoting_and_comments() {
        let parsed = parse_record(
            "# written by setup\n\
             LAF_LIGHT=org.kde.breeze\n\
             export LAF_DARK=\"org.kde.breezedark\"\n\
             SCRIPT_DARK='/home/me/bin/dark mode.sh'\n\
             \n\
             not a setting\n\
             KONSOLE_DARK=\"Say \\\"hi\\\" \\$HOME\"\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("LAF_LIGHT".to_string(), "org.kde.breeze".to_string()),
                ("LAF_DARK".to_string(), "org.kde.breezedark".to_string()),
                ("SCRIPT_DARK".to_string(), "/home/me/bin/dark mode.sh".to_string()),
                ("KONSOLE_DARK".to_string(), "Say \"hi\" $HOME".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_then_parse_preserves_values() {
        let entries = vec![
            ("LAF_LIGHT".to_string(), "org.kde.breeze".to_string()),
            ("KONSOLE_DARK".to_string(), "Quote \" and \\ and $x".to_string()),
        ];
        assert_eq!(parse_record(&render_record(&entries)), entries);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config"));
        assert!(matches!(store.load(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("config"));

        let mut settings = Settings::new(ThemePair::new("org.kde.breeze", "org.kde.breezedark")).unwrap();
        settings.set_domain(Domain::Gtk, Some(ThemePair::new("Adwaita", "Adwaita-dark")));
        store.save(&settings).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.value_for(Domain::Gtk, Mode::Light).as_deref(), Some("Adwaita"));
        assert!(!dir.path().join("nested").join("config.tmp").exists());
    }

    #[test]
    fn test_load_rejects_identical_packages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "LAF_LIGHT=org.kde.breeze\nLAF_DARK=org.kde.breeze\n").unwrap();
        let err = ConfigStore::new(path).load().unwrap_err();
        assert!(matches!(err, ConfigError::SamePackage(_)));
    }
}
