//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/marks/config.toml)
//! 3. Environment variables (MARKS_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "MARKS";

/// Browser profile used when none is configured
pub const DEFAULT_PROFILE: &str = "Default";

/// Number of change records shown by default
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Explicit path to the browser's Bookmarks file
    #[serde(default)]
    pub bookmarks_file: Option<PathBuf>,

    /// Browser profile directory name, used when `bookmarks_file` is unset
    #[serde(default = "default_profile")]
    pub browser_profile: String,

    /// Directory for the change log database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default number of entries shown by `history`
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bookmarks_file: None,
            browser_profile: default_profile(),
            data_dir: default_data_dir(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MARKS_BOOKMARKS_FILE, MARKS_PROFILE, MARKS_DATA_DIR, MARKS_HISTORY_LIMIT)
    /// 2. Config file (~/.config/marks/config.toml or MARKS_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // MARKS_BOOKMARKS_FILE
        if let Ok(val) = std::env::var(format!("{}_BOOKMARKS_FILE", ENV_PREFIX)) {
            self.bookmarks_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // MARKS_PROFILE
        if let Ok(val) = std::env::var(format!("{}_PROFILE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.browser_profile = val;
            }
        }

        // MARKS_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // MARKS_HISTORY_LIMIT
        if let Ok(val) = std::env::var(format!("{}_HISTORY_LIMIT", ENV_PREFIX)) {
            if let Ok(limit) = val.parse() {
                self.history_limit = limit;
            }
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bookmarks_file" => {
                self.bookmarks_file = if value.is_empty() || value == "none" {
                    None
                } else {
                    Some(value.into())
                };
            }
            "browser_profile" => {
                self.browser_profile = value.to_string();
            }
            "data_dir" => {
                self.data_dir = value.into();
            }
            "history_limit" => {
                self.history_limit = value
                    .parse()
                    .context("Invalid value for history_limit. Use a positive number.")?;
            }
            _ => {
                anyhow::bail!(
                    "Unknown configuration key: '{}'\n\
                     Valid keys: bookmarks_file, browser_profile, data_dir, history_limit",
                    key
                );
            }
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MARKS_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("marks")
            .join("config.toml")
    }

    /// Path of the Bookmarks file to operate on
    ///
    /// The explicit `bookmarks_file` wins; otherwise the file is looked up
    /// in the browser profile directory for this platform.
    pub fn bookmarks_path(&self) -> PathBuf {
        if let Some(ref path) = self.bookmarks_file {
            return path.clone();
        }

        let candidates = browser_profile_dirs(&self.browser_profile);
        candidates
            .iter()
            .map(|dir| dir.join("Bookmarks"))
            .find(|path| path.exists())
            .or_else(|| candidates.first().map(|dir| dir.join("Bookmarks")))
            .unwrap_or_else(|| PathBuf::from("Bookmarks"))
    }

    /// Get the path to the change log database
    pub fn changes_db_path(&self) -> PathBuf {
        self.data_dir.join("changes.db")
    }
}

/// Candidate profile directories, most preferred first
fn browser_profile_dirs(profile: &str) -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::config_dir()
            .map(|base| vec![base.join("Google").join("Chrome").join(profile)])
            .unwrap_or_default()
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|base| {
                vec![base
                    .join("Google")
                    .join("Chrome")
                    .join("User Data")
                    .join(profile)]
            })
            .unwrap_or_default()
    } else {
        dirs::config_dir()
            .map(|base| {
                vec![
                    base.join("google-chrome").join(profile),
                    base.join("chromium").join(profile),
                ]
            })
            .unwrap_or_default()
    }
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marks")
}
