//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/jot/config.toml)
//! 3. Environment variables (JOT_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "JOT";

/// Default auto-save quiet period in milliseconds
pub const DEFAULT_AUTOSAVE_QUIET_MS: u64 = 2000;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the journal database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Milliseconds without edits before the editor saves
    #[serde(default = "default_quiet_ms")]
    pub autosave_quiet_ms: u64,

    /// User name the CLI acts as
    #[serde(default)]
    pub active_user: Option<String>,

    /// Log file (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_quiet_ms: DEFAULT_AUTOSAVE_QUIET_MS,
            active_user: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (JOT_DATA_DIR, JOT_AUTOSAVE_QUIET_MS, JOT_USER)
    /// 2. Config file (~/.config/jot/config.toml or JOT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path when one was given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
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
        config.ensure_data_dir()?;
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
        // JOT_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // JOT_AUTOSAVE_QUIET_MS, ignored unless it parses
        if let Ok(val) = std::env::var(format!("{}_AUTOSAVE_QUIET_MS", ENV_PREFIX)) {
            if let Ok(ms) = val.trim().parse() {
                self.autosave_quiet_ms = ms;
            }
        }

        // JOT_USER
        if let Ok(val) = std::env::var(format!("{}_USER", ENV_PREFIX)) {
            self.active_user = if val.is_empty() { None } else { Some(val) };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Set a value by key, as given on the command line
    ///
    /// `none` or an empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let cleared = value.is_empty() || value == "none";
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "autosave_quiet_ms" => {
                self.autosave_quiet_ms = value
                    .parse()
                    .context("Invalid value for autosave_quiet_ms. Use a number of milliseconds.")?;
            }
            "active_user" => {
                self.active_user = (!cleared).then(|| value.to_string());
            }
            "log_file" => {
                self.log_file = (!cleared).then(|| PathBuf::from(value));
            }
            _ => bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, autosave_quiet_ms, active_user, log_file",
                key
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
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
    /// Can be overridden with JOT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jot")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("journal.db")
    }

    /// Auto-save quiet period
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jot")
}

fn default_quiet_ms() -> u64 {
    DEFAULT_AUTOSAVE_QUIET_MS
}
