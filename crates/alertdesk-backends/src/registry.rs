//! The static backend table.
//!
//! Built once at startup from [`BackendsConfig`] and shared read-only by
//! every handler. Generic over the adapter types so the bot can be driven by
//! in-process fakes in tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{BackendsConfig, GRAFANA_NAME, parse_mute_durations};
use crate::dashboards::GrafanaDashboards;
use crate::error::Result;
use crate::grafana::{DatasourceRules, GrafanaRules};
use crate::http::ApiClient;
use crate::rules::{AlertBackend, AlertSource};
use crate::silences::{
    ALERTMANAGER_PREFIX, AlertmanagerApi, GRAFANA_AM_PREFIX, SilenceBackend, SilenceManager,
};

/// Every configured backend, in configuration order.
#[derive(Debug)]
pub struct Backends<A = AlertBackend, S = SilenceBackend, D = GrafanaDashboards> {
    /// Alert rule sources.
    pub sources: Vec<A>,
    /// Silence managers. Shared so aggregation tasks can hold them.
    pub silencers: Vec<Arc<S>>,
    /// Dashboard source, when Grafana is configured.
    pub dashboards: Option<D>,
    /// Alert source name to silence manager name.
    pub pairings: BTreeMap<String, String>,
}

impl<A, S, D> Default for Backends<A, S, D> {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            silencers: Vec::new(),
            dashboards: None,
            pairings: BTreeMap::new(),
        }
    }
}

impl Backends {
    /// Builds the table from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be built or a mute duration does
    /// not parse.
    pub fn from_config(config: &BackendsConfig, timeout: Duration) -> Result<Self> {
        let mut backends = Self::default();

        if let Some(grafana) = &config.grafana {
            let client = ApiClient::new(GRAFANA_NAME, &grafana.url, grafana.auth.clone(), timeout)?;

            backends.sources.push(AlertBackend::Grafana(GrafanaRules::new(
                client.clone(),
                GRAFANA_NAME,
                grafana.alerting.enabled,
            )));
            if let Some(manager) = &grafana.alerting.silences {
                backends
                    .pairings
                    .insert(GRAFANA_NAME.to_string(), manager.clone());
            }

            let datasources = &grafana.datasources;
            backends
                .sources
                .push(AlertBackend::Datasources(DatasourceRules::new(
                    client.clone(),
                    datasources.name.clone(),
                    datasources.datasource_type.clone(),
                    datasources.enabled,
                )));
            if let Some(manager) = &datasources.silences {
                backends
                    .pairings
                    .insert(datasources.name.clone(), manager.clone());
            }

            backends
                .silencers
                .push(Arc::new(SilenceBackend::Grafana(AlertmanagerApi::new(
                    client.clone(),
                    GRAFANA_NAME,
                    GRAFANA_AM_PREFIX,
                    grafana.silences.enabled,
                    parse_mute_durations(&grafana.silences.mute_durations)?,
                ))));

            backends.dashboards = Some(GrafanaDashboards::new(
                client,
                grafana.dashboards.public_url.as_deref(),
                grafana.dashboards.enabled,
            ));
        }

        for am in &config.alertmanagers {
            let client = ApiClient::new(am.name.clone(), &am.url, am.auth.clone(), timeout)?;
            backends
                .silencers
                .push(Arc::new(SilenceBackend::Alertmanager(AlertmanagerApi::new(
                    client,
                    am.name.clone(),
                    ALERTMANAGER_PREFIX,
                    am.enabled,
                    parse_mute_durations(&am.mute_durations)?,
                ))));
        }

        info!(
            sources = backends.sources.len(),
            silence_managers = backends.silencers.len(),
            dashboards = backends.dashboards.is_some(),
            "backend table built"
        );
        Ok(backends)
    }
}

impl<A: AlertSource, S, D> Backends<A, S, D> {
    /// Enabled alert sources in table order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &A> {
        self.sources.iter().filter(|s| s.enabled())
    }
}

impl<A, S: SilenceManager, D> Backends<A, S, D> {
    /// Enabled silence managers with their table index.
    pub fn enabled_silencers(&self) -> impl Iterator<Item = (usize, &Arc<S>)> {
        self.silencers
            .iter()
            .enumerate()
            .filter(|(_, s)| s.enabled())
    }

    /// Looks up a silence manager by name, case-insensitively.
    #[must_use]
    pub fn silencer_by_name(&self, name: &str) -> Option<(usize, &Arc<S>)> {
        self.silencers
            .iter()
            .enumerate()
            .find(|(_, s)| s.name().eq_ignore_ascii_case(name))
    }

    /// Silence manager used for alerts of `source`.
    ///
    /// The configured pairing when it names an enabled manager, otherwise
    /// the first enabled manager.
    #[must_use]
    pub fn silencer_for(&self, source: &str) -> Option<(usize, &Arc<S>)> {
        self.pairings
            .get(source)
            .and_then(|name| self.silencer_by_name(name))
            .filter(|(_, s)| s.enabled())
            .or_else(|| self.enabled_silencers().next())
    }
}
