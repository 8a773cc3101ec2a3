//! The settings record: theme packages plus per-domain light/dark values
//!
//! Built once per command from the `KEY=value` record and passed explicitly to
//! everything that needs it. Nothing reads configuration on its own.

use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::apply::Domain;
use crate::config::ConfigError;
use crate::constants::keys;
use crate::mode::{normalize_package_id, Mode};

/// A value for each of the two concrete modes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemePair {
    pub light: String,
    pub dark: String,
}

impl ThemePair {
    pub fn new(light: impl Into<String>, dark: impl Into<String>) -> Self {
        Self {
            light: light.into(),
            dark: dark.into(),
        }
    }

    /// `None` for `Auto`
    pub fn get(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Light => Some(&self.light),
            Mode::Dark => Some(&self.dark),
            Mode::Auto => None,
        }
    }

    /// Both slots set → pair; both empty → `None`; one slot set is an
    /// unsupported partial pair and also collapses to `None`
    fn from_slots(name: &str, light: Option<String>, dark: Option<String>) -> Option<Self> {
        let light = light.filter(|v| !v.is_empty());
        let dark = dark.filter(|v| !v.is_empty());
        match (light, dark) {
            (Some(light), Some(dark)) => Some(Self { light, dark }),
            (None, None) => None,
            (light, dark) => {
                warn!(
                    setting = %name,
                    light = ?light,
                    dark = ?dark,
                    "Only one of the light/dark values is set, treating as not configured"
                );
                None
            }
        }
    }
}

/// Where generated theme packages are installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallScope {
    #[default]
    User,
    System,
}

impl InstallScope {
    pub fn as_str(self) -> &'static str {
        match self {
            InstallScope::User => "user",
            InstallScope::System => "system",
        }
    }
}

impl fmt::Display for InstallScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Light and dark theme package ids; always distinct
    pub laf: ThemePair,
    domains: BTreeMap<Domain, ThemePair>,
    /// Generated packages in use, if any
    pub custom_theme: Option<ThemePair>,
    /// Packages the generated ones were forked from
    pub base_theme: Option<ThemePair>,
    pub install_scope: InstallScope,
    /// Keys this program does not interpret, kept across load/save
    extra: Vec<(String, String)>,
}

impl Settings {
    pub fn new(laf: ThemePair) -> Result<Self, ConfigError> {
        let settings = Self {
            laf,
            domains: BTreeMap::new(),
            custom_theme: None,
            base_theme: None,
            install_scope: InstallScope::default(),
            extra: Vec::new(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Build from parsed `KEY=value` entries. Later duplicates win.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        let mut order: Vec<String> = Vec::new();
        for (key, value) in entries {
            if !map.contains_key(&key) {
                order.push(key.clone());
            }
            map.insert(key, value);
        }

        let mut take = |key: &str| map.remove(key).filter(|v| !v.is_empty());

        let laf_light = take(keys::LAF_LIGHT).ok_or(ConfigError::MissingKey(keys::LAF_LIGHT))?;
        let laf_dark = take(keys::LAF_DARK).ok_or(ConfigError::MissingKey(keys::LAF_DARK))?;

        let custom_theme = ThemePair::from_slots(
            "CUSTOM_THEME",
            take(keys::CUSTOM_THEME_LIGHT),
            take(keys::CUSTOM_THEME_DARK),
        );
        let base_theme = ThemePair::from_slots(
            "BASE_THEME",
            take(keys::BASE_THEME_LIGHT),
            take(keys::BASE_THEME_DARK),
        );

        let install_scope = match take(keys::INSTALL_SCOPE).as_deref() {
            None | Some("user") => InstallScope::User,
            Some("system") => InstallScope::System,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: keys::INSTALL_SCOPE.to_string(),
                    value: other.to_string(),
                });
            }
        };

        let mut domains = BTreeMap::new();
        for domain in Domain::configurable() {
            let Some(prefix) = domain.key_prefix() else {
                continue;
            };
            let light = take(format!("{prefix}{}", keys::LIGHT_SUFFIX).as_str());
            let dark = take(format!("{prefix}{}", keys::DARK_SUFFIX).as_str());
            if let Some(pair) = ThemePair::from_slots(prefix, light, dark) {
                domains.insert(domain, pair);
            }
        }

        let extra = order
            .into_iter()
            .filter_map(|key| map.remove(&key).map(|value| (key, value)))
            .collect();

        let settings = Self {
            laf: ThemePair::new(laf_light, laf_dark),
            domains,
            custom_theme,
            base_theme,
            install_scope,
            extra,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Canonical `KEY=value` entries, extras last
    pub fn to_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![
            (keys::LAF_LIGHT.to_string(), self.laf.light.clone()),
            (keys::LAF_DARK.to_string(), self.laf.dark.clone()),
        ];
        for domain in Domain::configurable() {
            let (Some(prefix), Some(pair)) = (domain.key_prefix(), self.domains.get(&domain)) else {
                continue;
            };
            entries.push((format!("{prefix}{}", keys::LIGHT_SUFFIX), pair.light.clone()));
            entries.push((format!("{prefix}{}", keys::DARK_SUFFIX), pair.dark.clone()));
        }
        if let Some(custom) = &self.custom_theme {
            entries.push((keys::CUSTOM_THEME_LIGHT.to_string(), custom.light.clone()));
            entries.push((keys::CUSTOM_THEME_DARK.to_string(), custom.dark.clone()));
        }
        if let Some(base) = &self.base_theme {
            entries.push((keys::BASE_THEME_LIGHT.to_string(), base.light.clone()));
            entries.push((keys::BASE_THEME_DARK.to_string(), base.dark.clone()));
        }
        entries.push((keys::INSTALL_SCOPE.to_string(), self.install_scope.as_str().to_string()));
        entries.extend(self.extra.iter().cloned());
        entries
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.laf.light.trim().is_empty() {
            return Err(ConfigError::MissingKey(keys::LAF_LIGHT));
        }
        if self.laf.dark.trim().is_empty() {
            return Err(ConfigError::MissingKey(keys::LAF_DARK));
        }
        if normalize_package_id(&self.laf.light) == normalize_package_id(&self.laf.dark) {
            return Err(ConfigError::SamePackage(self.laf.light.clone()));
        }
        Ok(())
    }

    pub fn domain(&self, domain: Domain) -> Option<&ThemePair> {
        self.domains.get(&domain)
    }

    /// Replace a domain's pair; empty slots clear the domain
    pub fn set_domain(&mut self, domain: Domain, pair: Option<ThemePair>) {
        match pair.and_then(|p| ThemePair::from_slots(domain.name(), Some(p.light), Some(p.dark))) {
            Some(pair) if domain.key_prefix().is_some() => {
                self.domains.insert(domain, pair);
            }
            _ => {
                self.domains.remove(&domain);
            }
        }
    }

    /// Value an applier receives for `mode`, if the domain is active
    pub fn value_for(&self, domain: Domain, mode: Mode) -> Option<String> {
        match domain {
            Domain::BrowserHint => match mode {
                Mode::Light => Some("default".to_string()),
                Mode::Dark => Some("prefer-dark".to_string()),
                Mode::Auto => None,
            },
            _ => self
                .domain(domain)
                .and_then(|pair| pair.get(mode))
                .map(str::to_string),
        }
    }

    /// True when generated packages carry the bundled domains
    pub fn custom_themes_active(&self) -> bool {
        self.custom_theme.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_from_entries_reads_domains() {
        let settings = Settings::from_entries(entries(&[
            ("LAF_LIGHT", "org.kde.breeze"),
            ("LAF_DARK", "org.kde.breezedark"),
            ("GTK_LIGHT", "Adwaita"),
            ("GTK_DARK", "Adwaita-dark"),
        ]))
        .unwrap();

        assert_eq!(settings.laf, ThemePair::new("org.kde.breeze", "org.kde.breezedark"));
        assert_eq!(settings.value_for(Domain::Gtk, Mode::Dark).as_deref(), Some("Adwaita-dark"));
        assert_eq!(settings.value_for(Domain::Icons, Mode::Dark), None);
        assert!(!settings.custom_themes_active());
        assert_eq!(settings.install_scope, InstallScope::User);
    }

    #[test]
    fn test_same_light_and_dark_rejected() {
        let err = Settings::from_entries(entries(&[
            ("LAF_LIGHT", "org.kde.breeze"),
            ("LAF_DARK", "org.kde.breeze"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::SamePackage(_)));

        let err = Settings::new(ThemePair::new("org.kde.breeze.desktop", "org.kde.breeze")).unwrap_err();
        assert!(matches!(err, ConfigError::SamePackage(_)));
    }

    #[test]
    fn test_missing_package_key_rejected() {
        let err = Settings::from_entries(entries(&[("LAF_LIGHT", "org.kde.breeze")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("LAF_DARK")));
    }

    #[test]
    fn test_partial_pair_collapses_to_empty() {
        let settings = Settings::from_entries(entries(&[
            ("LAF_LIGHT", "org.kde.breeze"),
            ("LAF_DARK", "org.kde.breezedark"),
            ("ICON_LIGHT", "Papirus"),
            ("ICON_DARK", ""),
            ("CUSTOM_THEME_DARK", "plasma-daynight-sync.custom.dark"),
        ]))
        .unwrap();
        assert!(settings.domain(Domain::Icons).is_none());
        assert!(settings.custom_theme.is_none());
    }

    #[test]
    fn test_set_domain_partial_pair_clears() {
        let mut settings = Settings::new(ThemePair::new("a", "b")).unwrap();
        settings.set_domain(Domain::Cursor, Some(ThemePair::new("Bibata", "Bibata-Dark")));
        assert!(settings.domain(Domain::Cursor).is_some());
        settings.set_domain(Domain::Cursor, Some(ThemePair::new("Bibata", "")));
        assert!(settings.domain(Domain::Cursor).is_none());
        settings.set_domain(Domain::BrowserHint, Some(ThemePair::new("x", "y")));
        assert!(settings.domain(Domain::BrowserHint).is_none());
    }

    #[test]
    fn test_browser_hint_follows_mode() {
        let settings = Settings::new(ThemePair::new("a", "b")).unwrap();
        assert_eq!(settings.value_for(Domain::BrowserHint, Mode::Dark).as_deref(), Some("prefer-dark"));
        assert_eq!(settings.value_for(Domain::BrowserHint, Mode::Light).as_deref(), Some("default"));
        assert_eq!(settings.value_for(Domain::BrowserHint, Mode::Auto), None);
    }

    #[test]
    fn test_entries_keep_unknown_keys_and_order() {
        let settings = Settings::from_entries(entries(&[
            ("SETUP_VERSION", "3"),
            ("LAF_LIGHT", "org.kde.breeze"),
            ("LAF_DARK", "org.kde.breezedark"),
            ("INSTALL_SCOPE", "system"),
            ("WIDGET_INSTALLED", "true"),
        ]))
        .unwrap();
        assert_eq!(settings.install_scope, InstallScope::System);

        let out = settings.to_entries();
        assert_eq!(out[0], ("LAF_LIGHT".to_string(), "org.kde.breeze".to_string()));
        let tail: Vec<&str> = out.iter().rev().take(2).map(|(k, _)| k.as_str()).collect();
        assert_eq!(tail, vec!["WIDGET_INSTALLED", "SETUP_VERSION"]);
        assert_eq!(Settings::from_entries(out).unwrap(), settings);
    }

    #[test]
    fn test_invalid_install_scope() {
        let err = Settings::from_entries(entries(&[
            ("LAF_LIGHT", "a"),
            ("LAF_DARK", "b"),
            ("INSTALL_SCOPE", "global"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
