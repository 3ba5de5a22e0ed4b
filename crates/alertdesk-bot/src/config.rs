//! Bot configuration.
//!
//! One TOML file holds the chat-side settings and the backend table:
//!
//! ```toml
//! [bot]
//! per_page = 5
//! allowed_users = [1001]
//!
//! [grafana]
//! url = "http://grafana:3000"
//! auth = { type = "bearer", token = "glsa_..." }
//!
//! [[alertmanagers]]
//! name = "prod"
//! url = "http://alertmanager:9093"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use alertdesk_backends::{
    AlertmanagerConfig, Auth, BackendError, BackendsConfig, DEFAULT_MUTE_DURATIONS,
    GrafanaConfig,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("failed to write config file '{}': {source}", .path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML does not parse.
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("{0}")]
    Invalid(String),

    /// The backend table is invalid.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Chat-side settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Rows per listing page.
    pub per_page: usize,
    /// Chat user IDs allowed to use the bot; empty allows everyone.
    pub allowed_users: Vec<i64>,
    /// Comment attached to silences created from chat.
    pub comment: String,
    /// Timeout for each backend request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            per_page: 5,
            allowed_users: Vec::new(),
            comment: "Silenced from chat".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl BotSettings {
    /// Backend request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether `user_id` may use the bot.
    #[must_use]
    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id)
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Chat-side settings.
    #[serde(default)]
    pub bot: BotSettings,
    /// Grafana instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana: Option<GrafanaConfig>,
    /// Alertmanager instances.
    #[serde(default)]
    pub alertmanagers: Vec<AlertmanagerConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range or the backend table is
    /// inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.per_page == 0 {
            return Err(ConfigError::Invalid(
                "bot.per_page must be greater than 0".to_string(),
            ));
        }
        if self.bot.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "bot.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.grafana.is_none() && self.alertmanagers.is_empty() {
            return Err(ConfigError::Invalid(
                "configure [grafana] or at least one [[alertmanagers]] entry".to_string(),
            ));
        }
        self.backends().validate()?;
        Ok(())
    }

    /// The backend table.
    #[must_use]
    pub fn backends(&self) -> BackendsConfig {
        BackendsConfig {
            grafana: self.grafana.clone(),
            alertmanagers: self.alertmanagers.clone(),
        }
    }

    /// A starting configuration for `init-config`.
    #[must_use]
    pub fn sample() -> Self {
        Self {
            bot: BotSettings::default(),
            grafana: Some(GrafanaConfig {
                url: "http://localhost:3000".to_string(),
                auth: Auth::Bearer {
                    token: "<service account token>".to_string(),
                },
                alerting: Default::default(),
                datasources: Default::default(),
                silences: Default::default(),
                dashboards: Default::default(),
            }),
            alertmanagers: vec![AlertmanagerConfig {
                name: "alertmanager".to_string(),
                url: "http://localhost:9093".to_string(),
                auth: Auth::None,
                enabled: true,
                mute_durations: DEFAULT_MUTE_DURATIONS
                    .iter()
                    .map(|d| (*d).to_string())
                    .collect(),
            }],
        }
    }

    /// Write configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
