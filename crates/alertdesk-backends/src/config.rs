//! Backend configuration.
//!
//! Describes the static table of backend instances:
//! - one optional Grafana instance with native alerting, datasource-proxied
//!   rules, its built-in silence API and dashboards
//! - any number of Alertmanager-compatible silence APIs

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use alertdesk_core::parse_duration;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, Result};

/// Display name of the Grafana alert source and silence manager.
pub const GRAFANA_NAME: &str = "Grafana";

/// Mute durations offered when none are configured.
pub const DEFAULT_MUTE_DURATIONS: [&str; 4] = ["1h", "4h", "1d", "1w"];

fn default_mute_durations() -> Vec<String> {
    DEFAULT_MUTE_DURATIONS.iter().map(|d| (*d).to_string()).collect()
}

const fn default_true() -> bool {
    true
}

/// Credentials attached to every request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    /// No authentication.
    #[default]
    None,
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// `Authorization: Bearer <token>`.
    Bearer {
        /// API token.
        token: String,
    },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
            Self::Bearer { .. } => write!(f, "Bearer(***)"),
        }
    }
}

/// Grafana-managed alert rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Whether the source is used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Name of the silence manager used for these alerts.
    #[serde(default)]
    pub silences: Option<String>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            silences: None,
        }
    }
}

/// Rules read through Grafana's datasource proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceRulesConfig {
    /// Whether the source is used.
    #[serde(default)]
    pub enabled: bool,
    /// Display name of the source.
    #[serde(default = "DatasourceRulesConfig::default_name")]
    pub name: String,
    /// Grafana datasource type to enumerate.
    #[serde(default = "DatasourceRulesConfig::default_type")]
    pub datasource_type: String,
    /// Name of the silence manager used for these alerts.
    #[serde(default)]
    pub silences: Option<String>,
}

impl DatasourceRulesConfig {
    fn default_name() -> String {
        "Prometheus".to_string()
    }

    fn default_type() -> String {
        "prometheus".to_string()
    }
}

impl Default for DatasourceRulesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: Self::default_name(),
            datasource_type: Self::default_type(),
            silences: None,
        }
    }
}

/// Grafana's built-in Alertmanager silences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrafanaSilencesConfig {
    /// Whether the silence manager is used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Durations offered as buttons.
    #[serde(default = "default_mute_durations")]
    pub mute_durations: Vec<String>,
}

impl Default for GrafanaSilencesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mute_durations: default_mute_durations(),
        }
    }
}

/// Dashboard and panel lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardsConfig {
    /// Whether dashboards are searchable.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL used in links handed to users, when it differs from `url`.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for DashboardsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_url: None,
        }
    }
}

/// A Grafana instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrafanaConfig {
    /// Base URL, e.g. `http://grafana:3000`.
    pub url: String,
    /// Credentials.
    #[serde(default)]
    pub auth: Auth,
    /// Native alert rules.
    #[serde(default)]
    pub alerting: AlertingConfig,
    /// Datasource-proxied rules.
    #[serde(default)]
    pub datasources: DatasourceRulesConfig,
    /// Built-in silences.
    #[serde(default)]
    pub silences: GrafanaSilencesConfig,
    /// Dashboards.
    #[serde(default)]
    pub dashboards: DashboardsConfig,
}

/// An Alertmanager-compatible silence API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertmanagerConfig {
    /// Display name, also used for `@name` targeting.
    pub name: String,
    /// Base URL, e.g. `http://alertmanager:9093`.
    pub url: String,
    /// Credentials.
    #[serde(default)]
    pub auth: Auth,
    /// Whether the silence manager is used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Durations offered as buttons.
    #[serde(default = "default_mute_durations")]
    pub mute_durations: Vec<String>,
}

/// The full backend table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Optional Grafana instance.
    #[serde(default)]
    pub grafana: Option<GrafanaConfig>,
    /// Alertmanager instances in configuration order.
    #[serde(default)]
    pub alertmanagers: Vec<AlertmanagerConfig>,
}

impl BackendsConfig {
    /// Names of every configured silence manager, in table order.
    #[must_use]
    pub fn silence_manager_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if self.grafana.is_some() {
            names.push(GRAFANA_NAME);
        }
        names.extend(self.alertmanagers.iter().map(|am| am.name.as_str()));
        names
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL or duration is malformed, a name is
    /// duplicated, or a pairing names an unknown silence manager.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.silence_manager_names() {
            if name.trim().is_empty() {
                return Err(BackendError::Config(
                    "alertmanager name cannot be empty".to_string(),
                ));
            }
            if name.contains(char::is_whitespace) {
                return Err(BackendError::Config(format!(
                    "silence manager name '{name}' cannot contain whitespace"
                )));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(BackendError::Config(format!(
                    "duplicate silence manager name '{name}'"
                )));
            }
        }

        if let Some(grafana) = &self.grafana {
            validate_url("grafana.url", &grafana.url)?;
            parse_mute_durations(&grafana.silences.mute_durations)?;
            if let Some(public_url) = &grafana.dashboards.public_url {
                validate_url("grafana.dashboards.public_url", public_url)?;
            }
            for pairing in [&grafana.alerting.silences, &grafana.datasources.silences]
                .into_iter()
                .flatten()
            {
                if !seen.contains(&pairing.to_ascii_lowercase()) {
                    return Err(BackendError::Config(format!(
                        "unknown silence manager '{pairing}'"
                    )));
                }
            }
            if grafana.datasources.datasource_type.trim().is_empty() {
                return Err(BackendError::Config(
                    "grafana.datasources.datasource_type cannot be empty".to_string(),
                ));
            }
        }

        for am in &self.alertmanagers {
            validate_url(&format!("alertmanagers.{}.url", am.name), &am.url)?;
            parse_mute_durations(&am.mute_durations)?;
        }

        Ok(())
    }
}

fn validate_url(field: &str, raw: &str) -> Result<()> {
    let parsed =
        url::Url::parse(raw).map_err(|e| BackendError::Config(format!("{field}: invalid URL: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(BackendError::Config(format!(
            "{field}: URL must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Parses configured mute durations, rejecting an empty list.
///
/// # Errors
///
/// Returns an error if the list is empty or an entry does not parse.
pub fn parse_mute_durations(raw: &[String]) -> Result<Vec<Duration>> {
    if raw.is_empty() {
        return Err(BackendError::Config(
            "mute_durations cannot be empty".to_string(),
        ));
    }
    raw.iter()
        .map(|d| parse_duration(d).map_err(BackendError::from))
        .collect()
}
