//! Configuration loading for ccmirror.
//!
//! Configuration is loaded from a TOML file. Without `--config`, the file
//! `ccmirror.toml` in the user's config directory is used if it exists.
//! Every field has a default, so an empty file (or none) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ccmirror_client::SessionConfig;
use serde::Deserialize;

/// Root configuration for ccmirror.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Relay configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session timing.
    #[serde(default)]
    pub session: SessionSettings,
    /// Watcher configuration.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Relay WebSocket URL.
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Role announced during association (default: controller).
    #[serde(default = "default_role")]
    pub role: String,
}

/// Session timing.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Dispatch cycle period in milliseconds (default: 500).
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Pause after each acknowledged dispatch in milliseconds (default: 100).
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Reply timeout in seconds; 0 waits forever (default: 30).
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
}

/// Watcher configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Skip paths with a component starting with `.` (default: true).
    #[serde(default = "default_ignore_hidden")]
    pub ignore_hidden: bool,
}

// Default value functions
fn default_server_url() -> String {
    "ws://dev.rodabafilms.com:25580/".to_string()
}

fn default_role() -> String {
    ccmirror_types::DEFAULT_ROLE.to_string()
}

fn default_cycle_interval_ms() -> u64 {
    500
}

fn default_pacing_ms() -> u64 {
    100
}

fn default_reply_timeout_secs() -> u64 {
    30
}

fn default_ignore_hidden() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            role: default_role(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            pacing_ms: default_pacing_ms(),
            reply_timeout_secs: default_reply_timeout_secs(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore_hidden: default_ignore_hidden(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load the explicit file if given, else the default file if present,
    /// else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "using default config file");
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Check values a TOML parser cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server.url.starts_with("ws://") || self.server.url.starts_with("wss://")) {
            return Err(ConfigError::Invalid {
                field: "server.url",
                reason: format!("expected a ws:// or wss:// URL, got {:?}", self.server.url),
            });
        }
        if self.server.role.is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.role",
                reason: "must not be empty".to_string(),
            });
        }
        if self.session.cycle_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "session.cycle_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Session configuration for joining `code`.
    pub fn session_config(&self, code: &str) -> SessionConfig {
        let reply_timeout = match self.session.reply_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        SessionConfig::new(&self.server.url, code)
            .with_role(&self.server.role)
            .with_cycle_interval(Duration::from_millis(self.session.cycle_interval_ms))
            .with_pacing(Duration::from_millis(self.session.pacing_ms))
            .with_reply_timeout(reply_timeout)
    }
}

/// Default config file location: `<config dir>/ccmirror.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "ccmirror")?;
    Some(dirs.config_dir().join("ccmirror.toml"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted name of the field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
