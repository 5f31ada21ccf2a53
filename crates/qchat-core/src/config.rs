//! Configuration management for qchat.
//!
//! Loads configuration from ${QCHAT_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `server_url`.
pub const SERVER_URL_ENV: &str = "QCHAT_SERVER_URL";

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for qchat configuration and data directories.
    //!
    //! QCHAT_HOME resolution order:
    //! 1. QCHAT_HOME environment variable (if set)
    //! 2. ~/.config/qchat (default)

    use std::path::PathBuf;

    /// Returns the qchat home directory.
    pub fn qchat_home() -> PathBuf {
        if let Ok(home) = std::env::var("QCHAT_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_default()
            .join(".config")
            .join("qchat")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        qchat_home().join("config.toml")
    }

    /// Returns the default chat storage directory.
    pub fn chats_dir() -> PathBuf {
        qchat_home().join("chats")
    }

    /// Returns the log directory.
    pub fn logs_dir() -> PathBuf {
        qchat_home().join("logs")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend
    pub server_url: String,
    /// Connect timeout in seconds (0 disables it)
    pub request_timeout_secs: u64,
    /// Chat storage directory override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: Self::DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            data_dir: None,
        }
    }
}

impl Config {
    pub const DEFAULT_SERVER_URL: &'static str = "http://localhost:8000";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Loads configuration from the default path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the default config template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }

    /// Resolves the backend URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn server_url(&self) -> Result<String> {
        resolve_server_url(std::env::var(SERVER_URL_ENV).ok().as_deref(), &self.server_url)
    }

    /// Connect timeout for the backend, if enabled.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Chat storage directory: the configured override or `$QCHAT_HOME/chats`.
    pub fn chats_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(paths::chats_dir)
    }
}

fn resolve_server_url(env_url: Option<&str>, config_url: &str) -> Result<String> {
    for candidate in [env_url, Some(config_url)].into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }
    Ok(Config::DEFAULT_SERVER_URL.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid server URL: {url}"))?;
    Ok(())
}
