//! Silence managers.
//!
//! Grafana's built-in Alertmanager and standalone Alertmanagers speak the
//! same v2 API under different base paths, so both variants of
//! [`SilenceBackend`] wrap one [`AlertmanagerApi`].

use std::future::Future;
use std::time::Duration;

use alertdesk_core::{MatchingAlert, Silence, filter_query};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{BackendError, Result};
use crate::http::ApiClient;

/// v2 API prefix of Grafana's built-in Alertmanager.
pub const GRAFANA_AM_PREFIX: &str = "/api/alertmanager/grafana/api/v2";

/// v2 API prefix of a standalone Alertmanager.
pub const ALERTMANAGER_PREFIX: &str = "/api/v2";

/// A backend that stores silences.
pub trait SilenceManager: Send + Sync {
    /// Whether the manager is switched on in configuration.
    fn enabled(&self) -> bool;

    /// Display name.
    fn name(&self) -> &str;

    /// Durations offered to users when silencing an alert.
    fn mute_durations(&self) -> Vec<Duration>;

    /// Fetches every silence the backend knows, in backend order.
    fn get_silences(&self) -> impl Future<Output = Result<Vec<Silence>>> + Send;

    /// Fetches one silence by ID.
    fn get_silence(&self, id: &str) -> impl Future<Output = Result<Silence>> + Send;

    /// Submits a silence and returns the backend-assigned ID.
    fn create_silence(&self, silence: &Silence) -> impl Future<Output = Result<String>> + Send;

    /// Expires a silence by ID.
    fn delete_silence(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Fetches the alerts a silence's matchers select, including silenced
    /// and inhibited ones.
    fn get_silence_matching_alerts(
        &self,
        silence: &Silence,
    ) -> impl Future<Output = Result<Vec<MatchingAlert>>> + Send;
}

#[derive(Debug, Deserialize)]
struct PostSilenceResponse {
    #[serde(rename = "silenceID")]
    silence_id: String,
}

/// Alertmanager v2 silence and alert endpoints.
#[derive(Debug, Clone)]
pub struct AlertmanagerApi {
    client: ApiClient,
    name: String,
    prefix: &'static str,
    enabled: bool,
    mute_durations: Vec<Duration>,
}

impl AlertmanagerApi {
    /// Creates the API wrapper.
    #[must_use]
    pub fn new(
        client: ApiClient,
        name: impl Into<String>,
        prefix: &'static str,
        enabled: bool,
        mute_durations: Vec<Duration>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            prefix,
            enabled,
            mute_durations,
        }
    }

    fn disabled(&self) -> BackendError {
        BackendError::Disabled {
            backend: self.name.clone(),
        }
    }

    fn silence_path(&self, id: &str) -> Result<String> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BackendError::InvalidId {
                backend: self.name.clone(),
                id: id.to_string(),
            });
        }
        Ok(format!("{}/silence/{id}", self.prefix))
    }
}

impl SilenceManager for AlertmanagerApi {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mute_durations(&self) -> Vec<Duration> {
        self.mute_durations.clone()
    }

    async fn get_silences(&self) -> Result<Vec<Silence>> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        self.client
            .get_json(&format!("{}/silences", self.prefix))
            .await
    }

    async fn get_silence(&self, id: &str) -> Result<Silence> {
        if !self.enabled {
            return Err(self.disabled());
        }
        let path = self.silence_path(id)?;
        self.client.get_json(&path).await
    }

    async fn create_silence(&self, silence: &Silence) -> Result<String> {
        if !self.enabled {
            return Err(self.disabled());
        }
        silence.validate()?;

        let response: PostSilenceResponse = self
            .client
            .post_json(&format!("{}/silences", self.prefix), silence)
            .await?;
        info!(
            backend = %self.name,
            silence_id = %response.silence_id,
            matchers = %silence.matcher_text(),
            ends_at = %silence.ends_at,
            "created silence"
        );
        Ok(response.silence_id)
    }

    async fn delete_silence(&self, id: &str) -> Result<()> {
        if !self.enabled {
            return Err(self.disabled());
        }
        let path = self.silence_path(id)?;
        self.client.delete(&path).await?;
        info!(backend = %self.name, silence_id = %id, "deleted silence");
        Ok(())
    }

    async fn get_silence_matching_alerts(&self, silence: &Silence) -> Result<Vec<MatchingAlert>> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let path = format!("{}/alerts?{}", self.prefix, filter_query(&silence.matchers));
        let alerts: Vec<MatchingAlert> = self.client.get_json(&path).await?;
        debug!(
            backend = %self.name,
            silence_id = silence.id.as_deref().unwrap_or("-"),
            alerts = alerts.len(),
            "fetched alerts matching silence"
        );
        Ok(alerts)
    }
}

/// The silence managers alertdesk knows how to talk to.
#[derive(Debug, Clone)]
pub enum SilenceBackend {
    /// Grafana's built-in Alertmanager.
    Grafana(AlertmanagerApi),
    /// A standalone Alertmanager.
    Alertmanager(AlertmanagerApi),
}

impl SilenceBackend {
    fn api(&self) -> &AlertmanagerApi {
        match self {
            Self::Grafana(api) | Self::Alertmanager(api) => api,
        }
    }

    /// Short label of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Grafana(_) => "grafana",
            Self::Alertmanager(_) => "alertmanager",
        }
    }
}

impl SilenceManager for SilenceBackend {
    fn enabled(&self) -> bool {
        self.api().enabled()
    }

    fn name(&self) -> &str {
        self.api().name()
    }

    fn mute_durations(&self) -> Vec<Duration> {
        self.api().mute_durations()
    }

    async fn get_silences(&self) -> Result<Vec<Silence>> {
        self.api().get_silences().await
    }

    async fn get_silence(&self, id: &str) -> Result<Silence> {
        self.api().get_silence(id).await
    }

    async fn create_silence(&self, silence: &Silence) -> Result<String> {
        self.api().create_silence(silence).await
    }

    async fn delete_silence(&self, id: &str) -> Result<()> {
        self.api().delete_silence(id).await
    }

    async fn get_silence_matching_alerts(&self, silence: &Silence) -> Result<Vec<MatchingAlert>> {
        self.api().get_silence_matching_alerts(silence).await
    }
}
