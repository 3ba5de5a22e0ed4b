//! Read-only alert rule sources.
//!
//! [`AlertSource`] is the capability every rules backend offers.
//! [`AlertBackend`] is the closed set of variants the bot is built with.

use std::future::Future;

use alertdesk_core::AlertGroup;
use serde::Deserialize;

use crate::error::{BackendError, Result};
use crate::grafana::{DatasourceRules, GrafanaRules};

/// A backend exposing alert rule groups.
pub trait AlertSource: Send + Sync {
    /// Whether the source is switched on in configuration.
    fn enabled(&self) -> bool;

    /// Display name.
    fn name(&self) -> &str;

    /// Fetches alerting rule groups.
    ///
    /// A disabled source returns an empty list without any network call.
    fn get_alerting_rules(&self) -> impl Future<Output = Result<Vec<AlertGroup>>> + Send;
}

/// Body of a Prometheus-style `/api/v1/rules` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesResponse {
    /// `success` or `error`.
    pub status: String,
    /// Payload on success.
    #[serde(default)]
    pub data: Option<RulesData>,
    /// Error class on failure.
    #[serde(default)]
    pub error_type: Option<String>,
    /// Error message on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// `data` block of a rules response.
#[derive(Debug, Default, Deserialize)]
pub struct RulesData {
    /// Rule groups.
    #[serde(default)]
    pub groups: Vec<AlertGroup>,
}

impl RulesResponse {
    /// Extracts the groups, keeping only alerting rules.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Decode` when the backend reported an error.
    pub fn into_groups(self, backend: &str) -> Result<Vec<AlertGroup>> {
        if self.status != "success" {
            let message = match (self.error_type, self.error) {
                (Some(kind), Some(msg)) => format!("{kind}: {msg}"),
                (None, Some(msg)) => msg,
                (Some(kind), None) => kind,
                (None, None) => format!("status {}", self.status),
            };
            return Err(BackendError::Decode {
                backend: backend.to_string(),
                message,
            });
        }

        Ok(self
            .data
            .unwrap_or_default()
            .groups
            .into_iter()
            .map(|mut group| {
                group.rules.retain(alertdesk_core::AlertRule::is_alerting);
                group
            })
            .collect())
    }
}

/// The rule sources alertdesk knows how to talk to.
#[derive(Debug, Clone)]
pub enum AlertBackend {
    /// Grafana-managed rules.
    Grafana(GrafanaRules),
    /// Rules of Prometheus-compatible datasources behind Grafana.
    Datasources(DatasourceRules),
}

impl AlertSource for AlertBackend {
    fn enabled(&self) -> bool {
        match self {
            Self::Grafana(source) => source.enabled(),
            Self::Datasources(source) => source.enabled(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Grafana(source) => source.name(),
            Self::Datasources(source) => source.name(),
        }
    }

    async fn get_alerting_rules(&self) -> Result<Vec<AlertGroup>> {
        match self {
            Self::Grafana(source) => source.get_alerting_rules().await,
            Self::Datasources(source) => source.get_alerting_rules().await,
        }
    }
}
