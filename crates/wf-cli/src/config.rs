//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wf_db::DatabaseOptions;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// How long a write waits for another process holding the lock.
    pub busy_timeout_ms: u64,
    /// Depth limit when materialising event trees.
    pub max_tree_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        let options = DatabaseOptions::default();
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("wf.db"),
            busy_timeout_ms: u64::try_from(options.busy_timeout.as_millis()).unwrap_or(u64::MAX),
            max_tree_depth: options.max_tree_depth,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `~/.config/wf/config.toml`, the given
    /// file, then `WF_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("WF_"));

        figment.extract()
    }

    pub const fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            max_tree_depth: self.max_tree_depth,
        }
    }
}

/// Returns the platform-specific config directory for wf.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wf"))
}

/// Returns the platform-specific data directory for wf.
///
/// On Linux: `~/.local/share/wf`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wf"))
}
