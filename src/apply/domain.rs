//! Subordinate appearance subsystems kept in sync with the desktop mode

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    /// Kvantum widget style engine
    StyleEngine,
    /// Plasma desktop style (panel/widget SVG theme)
    DesktopStyle,
    ColorScheme,
    Icons,
    Cursor,
    /// KWin window decoration
    Decoration,
    /// Konsole default profile
    TerminalProfile,
    Splash,
    Gtk,
    /// `prefer-dark` hint read by browsers and portals; derived from the mode
    BrowserHint,
    /// User script run on every switch
    Script,
}

impl Domain {
    /// The apply sequence, in order
    pub const APPLY_ORDER: [Domain; 11] = [
        Domain::StyleEngine,
        Domain::DesktopStyle,
        Domain::ColorScheme,
        Domain::Icons,
        Domain::Cursor,
        Domain::Decoration,
        Domain::TerminalProfile,
        Domain::Splash,
        Domain::Gtk,
        Domain::BrowserHint,
        Domain::Script,
    ];

    /// Settings key prefix; `None` for domains with no configured values
    pub fn key_prefix(self) -> Option<&'static str> {
        match self {
            Domain::StyleEngine => Some("KVANTUM"),
            Domain::DesktopStyle => Some("PLASMA_STYLE"),
            Domain::ColorScheme => Some("COLOR_SCHEME"),
            Domain::Icons => Some("ICON"),
            Domain::Cursor => Some("CURSOR"),
            Domain::Decoration => Some("DECORATION"),
            Domain::TerminalProfile => Some("KONSOLE"),
            Domain::Splash => Some("SPLASH"),
            Domain::Gtk => Some("GTK"),
            Domain::BrowserHint => None,
            Domain::Script => Some("SCRIPT"),
        }
    }

    /// Domains that can be folded into a generated theme package, which the
    /// desktop then applies itself when it switches packages
    pub fn is_bundled(self) -> bool {
        matches!(
            self,
            Domain::ColorScheme
                | Domain::Icons
                | Domain::Decoration
                | Domain::Cursor
                | Domain::DesktopStyle
                | Domain::Splash
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Domain::StyleEngine => "style-engine",
            Domain::DesktopStyle => "desktop-style",
            Domain::ColorScheme => "color-scheme",
            Domain::Icons => "icons",
            Domain::Cursor => "cursor",
            Domain::Decoration => "decoration",
            Domain::TerminalProfile => "terminal-profile",
            Domain::Splash => "splash",
            Domain::Gtk => "gtk",
            Domain::BrowserHint => "browser-hint",
            Domain::Script => "script",
        }
    }

    /// Domains with a light/dark pair in the settings record
    pub fn configurable() -> impl Iterator<Item = Domain> {
        Self::APPLY_ORDER.into_iter().filter(|d| d.key_prefix().is_some())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_order_is_complete_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for domain in Domain::APPLY_ORDER {
            assert!(seen.insert(domain), "{domain} listed twice");
        }
        assert_eq!(Domain::configurable().count(), 10);
    }

    #[test]
    fn test_bundled_domains() {
        let bundled: Vec<Domain> = Domain::APPLY_ORDER.into_iter().filter(|d| d.is_bundled()).collect();
        assert_eq!(
            bundled,
            vec![
                Domain::DesktopStyle,
                Domain::ColorScheme,
                Domain::Icons,
                Domain::Cursor,
                Domain::Decoration,
                Domain::Splash
            ]
        );
        assert!(!Domain::Gtk.is_bundled());
        assert!(!Domain::Script.is_bundled());
        assert!(!Domain::BrowserHint.is_bundled());
    }
}
