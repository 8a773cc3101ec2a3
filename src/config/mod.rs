//! Configuration management
//!
//! - **settings**: the typed `Settings` record handed to every command
//! - **store**: `ConfigStore`, reading and writing the `KEY=value` file

pub mod settings;
pub mod store;

use std::path::PathBuf;
use thiserror::Error;

pub use settings::{InstallScope, Settings, ThemePair};
pub use store::ConfigStore;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no settings found at {}; run the setup first", .0.display())]
    Missing(PathBuf),

    #[error("failed to access settings at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("required setting {0} is missing")]
    MissingKey(&'static str),

    #[error("light and dark theme packages must differ (both are '{0}')")]
    SamePackage(String),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
