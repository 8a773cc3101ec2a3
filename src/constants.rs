//! Application-wide constants
//!
//! File names, config keys, external tool names and timings used throughout
//! the application, kept in one place.

/// Application directory and file names
pub mod paths {
    /// Directory name under XDG config/state/runtime dirs
    pub const APP_DIR: &str = "plasma-daynight-sync";

    /// Settings record file name
    pub const CONFIG_FILENAME: &str = "config";

    /// Debounce marker file name (runtime dir)
    pub const DEBOUNCE_MARKER: &str = "debounce";

    /// Last-applied mode file name (runtime dir)
    pub const STATUS_FILE: &str = "mode";

    /// Watcher pid file name (runtime dir)
    pub const WATCHER_PID: &str = "watch.pid";

    /// Log sink file name (state dir)
    pub const LOG_FILE: &str = "sync.log";

    /// KDE global settings file watched for package switches
    pub const KDEGLOBALS: &str = "kdeglobals";

    /// Per-user look-and-feel package root (relative to the data dir)
    pub const USER_LAF_SUBDIR: &str = "plasma/look-and-feel";

    /// System-wide look-and-feel package root
    pub const SYSTEM_LAF_DIR: &str = "/usr/share/plasma/look-and-feel";

    /// Directories searched for `plasma-changeicons`
    pub const LIBEXEC_DIRS: &[&str] = &[
        "/usr/lib/x86_64-linux-gnu/libexec",
        "/usr/libexec",
        "/usr/lib/libexec",
        "/usr/lib",
    ];
}

/// Settings record keys
pub mod keys {
    pub const LAF_LIGHT: &str = "LAF_LIGHT";
    pub const LAF_DARK: &str = "LAF_DARK";
    pub const CUSTOM_THEME_LIGHT: &str = "CUSTOM_THEME_LIGHT";
    pub const CUSTOM_THEME_DARK: &str = "CUSTOM_THEME_DARK";
    pub const BASE_THEME_LIGHT: &str = "BASE_THEME_LIGHT";
    pub const BASE_THEME_DARK: &str = "BASE_THEME_DARK";
    pub const INSTALL_SCOPE: &str = "INSTALL_SCOPE";

    /// Suffixes of per-domain pairs (`<DOMAIN>_LIGHT` / `<DOMAIN>_DARK`)
    pub const LIGHT_SUFFIX: &str = "_LIGHT";
    pub const DARK_SUFFIX: &str = "_DARK";
}

/// KDE configuration groups and keys read or written directly
pub mod kde {
    /// Group in kdeglobals holding the active package
    pub const KDE_GROUP: &str = "[KDE]";

    /// Active look-and-feel package key
    pub const LAF_KEY: &str = "LookAndFeelPackage";

    /// Automatic day/night switching flag
    pub const AUTOMATIC_KEY: &str = "AutomaticLookAndFeel";

    /// Package Plasma falls back to when none is recorded
    pub const DEFAULT_LAF: &str = "org.kde.breeze.desktop";
}

/// External tools invoked by appliers and the desktop binding
pub mod tools {
    pub const KWRITECONFIG: &str = "kwriteconfig6";
    pub const APPLY_LOOKANDFEEL: &str = "plasma-apply-lookandfeel";
    pub const APPLY_DESKTOPTHEME: &str = "plasma-apply-desktoptheme";
    pub const APPLY_COLORSCHEME: &str = "plasma-apply-colorscheme";
    pub const APPLY_CURSORTHEME: &str = "plasma-apply-cursortheme";
    pub const CHANGEICONS: &str = "plasma-changeicons";
    pub const KVANTUMMANAGER: &str = "kvantummanager";
    pub const QDBUS: &str = "qdbus6";
    pub const DBUS_SEND: &str = "dbus-send";
    pub const GSETTINGS: &str = "gsettings";
}

/// Generated theme package identity
pub mod forge {
    /// Id prefix of forked packages (suffixed with `.light` / `.dark`)
    pub const CUSTOM_ID_PREFIX: &str = "plasma-daynight-sync.custom";

    /// Metadata key recording the package a fork was generated from
    pub const BASE_REFERENCE_KEY: &str = "X-PlasmaDaynightSync-Base";

    /// Override value meaning "no splash screen"
    pub const SPLASH_DISABLED: &str = "None";

    /// Author recorded when the base package names none
    pub const UNKNOWN_AUTHOR: &str = "Unknown";

    /// Layout script location inside a package
    pub const LAYOUT_FILE: &str = "contents/layouts/org.kde.plasma.desktop-layout.js";

    /// Defaults artifact inside a package
    pub const DEFAULTS_FILE: &str = "contents/defaults";

    /// Splash assets inside a package
    pub const SPLASH_DIR: &str = "contents/splash";
}

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// Minimum interval between two effective applies, across all trigger sources
    pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(3);

    /// Delay before applying after the desktop switched packages on its own.
    /// Plasma does not signal completion of its package application.
    pub const WATCH_SETTLE_DELAY: Duration = Duration::from_secs(1);

    /// Delay before applying after a forced CLI package switch
    pub const FORCE_SETTLE_DELAY: Duration = Duration::from_secs(2);

    /// Upper bound of one blocking wait so shutdown signals are noticed
    pub const SHUTDOWN_POLL: Duration = Duration::from_millis(500);
}

/// Log sink constants
pub mod logging {
    /// Size at which the log file rotates to `<name>.old`
    pub const LOG_MAX_BYTES: u64 = 512 * 1024;

    /// Environment variable selecting the log level
    pub const LEVEL_ENV: &str = "LOG_LEVEL";
}
