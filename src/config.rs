//! Host configuration: listen address, search tuning, sources and users.
//!
//! Loaded from TOML. Every section falls back to defaults for missing
//! fields, so a minimal file only lists `[[sources]]` and `[[users]]`.
//!
//! ```toml
//! [server]
//! port = 3000
//!
//! [search]
//! per_source_timeout_ms = 20000
//!
//! [[sources]]
//! key = "alpha"
//! name = "Alpha"
//! api = "https://alpha.example/api.php/provide/vod"
//!
//! [[users]]
//! username = "alice"
//! token = "s3cret"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vidhub_search::{SearchConfig, SourceDescriptor};

use crate::error::{AppError, Result};

/// Complete host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub search: SearchConfig,
    /// Upstream sources in registration order.
    pub sources: Vec<SourceEntry>,
    pub users: Vec<UserEntry>,
}

/// Listen address of the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on (0 = auto-assign).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

/// One configured upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Stable key, unique across sources.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Search API endpoint.
    pub api: String,
    /// Detail page base URL, if the source has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Disabled sources are never queried.
    #[serde(default)]
    pub disabled: bool,
}

impl SourceEntry {
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            key: self.key.clone(),
            name: self.name.clone(),
            api: self.api.clone(),
            detail: self.detail.clone(),
        }
    }
}

/// One user allowed to query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// Bearer token or `auth` cookie value identifying this user.
    pub token: String,
    /// Restricts the user to these source keys. `None` means every enabled source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_sources: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/vidhub/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("vidhub").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("vidhub")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/vidhub-config/config.toml")
        }
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - the search section is valid
    /// - source keys and APIs are non-empty and keys are unique
    /// - usernames and tokens are non-empty and tokens are unique
    /// - every `enabled_sources` entry names a configured source
    ///
    /// # Errors
    ///
    /// Returns an error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;

        let mut keys = HashSet::new();
        for source in &self.sources {
            if source.key.trim().is_empty() {
                return Err(AppError::Config("source key must not be empty".into()));
            }
            if source.api.trim().is_empty() {
                return Err(AppError::Config(format!("source {} has no api", source.key)));
            }
            if !keys.insert(source.key.as_str()) {
                return Err(AppError::Config(format!("duplicate source key {}", source.key)));
            }
        }

        let mut tokens = HashSet::new();
        for user in &self.users {
            if user.username.trim().is_empty() {
                return Err(AppError::Config("username must not be empty".into()));
            }
            if user.token.is_empty() {
                return Err(AppError::Config(format!("user {} has an empty token", user.username)));
            }
            if !tokens.insert(user.token.as_str()) {
                return Err(AppError::Config(format!(
                    "user {} shares a token with another user",
                    user.username
                )));
            }
            for key in user.enabled_sources.iter().flatten() {
                if !keys.contains(key.as_str()) {
                    return Err(AppError::Config(format!(
                        "user {} enables unknown source {key}",
                        user.username
                    )));
                }
            }
        }

        Ok(())
    }
}
