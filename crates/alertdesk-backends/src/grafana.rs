//! Grafana rule sources.
//!
//! [`GrafanaRules`] reads Grafana-managed rules directly. [`DatasourceRules`]
//! enumerates Grafana datasources of one type and reads each one's rules
//! through Grafana's Prometheus proxy, concurrently.

use alertdesk_core::AlertGroup;
use futures::future::try_join_all;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::http::ApiClient;
use crate::rules::{AlertSource, RulesResponse};

const GRAFANA_RULES_PATH: &str = "/api/prometheus/grafana/api/v1/rules";
const DATASOURCES_PATH: &str = "/api/datasources";

/// Grafana-managed alert rules.
#[derive(Debug, Clone)]
pub struct GrafanaRules {
    client: ApiClient,
    name: String,
    enabled: bool,
}

impl GrafanaRules {
    /// Creates the source.
    #[must_use]
    pub fn new(client: ApiClient, name: impl Into<String>, enabled: bool) -> Self {
        Self {
            client,
            name: name.into(),
            enabled,
        }
    }
}

impl AlertSource for GrafanaRules {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_alerting_rules(&self) -> Result<Vec<AlertGroup>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let response: RulesResponse = self.client.get_json(GRAFANA_RULES_PATH).await?;
        let groups = response.into_groups(&self.name)?;
        debug!(source = %self.name, groups = groups.len(), "fetched grafana rules");
        Ok(groups)
    }
}

/// A Grafana datasource entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Datasource {
    /// Datasource UID.
    pub uid: String,
    /// Display name.
    pub name: String,
    /// Plugin type, e.g. `prometheus`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Rules of every datasource of one type, read through Grafana.
#[derive(Debug, Clone)]
pub struct DatasourceRules {
    client: ApiClient,
    name: String,
    datasource_type: String,
    enabled: bool,
}

impl DatasourceRules {
    /// Creates the source.
    #[must_use]
    pub fn new(
        client: ApiClient,
        name: impl Into<String>,
        datasource_type: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            datasource_type: datasource_type.into(),
            enabled,
        }
    }

    /// Lists datasources of the configured type, in Grafana's order.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the datasource list cannot be fetched.
    pub async fn datasources(&self) -> Result<Vec<Datasource>> {
        let all: Vec<Datasource> = self.client.get_json(DATASOURCES_PATH).await?;
        Ok(all
            .into_iter()
            .filter(|ds| ds.kind.eq_ignore_ascii_case(&self.datasource_type))
            .collect())
    }

    async fn datasource_rules(&self, datasource: &Datasource) -> Result<Vec<AlertGroup>> {
        let path = format!("/api/prometheus/{}/api/v1/rules", datasource.uid);
        let response: RulesResponse = self.client.get_json(&path).await?;
        response.into_groups(&format!("{}/{}", self.name, datasource.name))
    }
}

impl AlertSource for DatasourceRules {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn get_alerting_rules(&self) -> Result<Vec<AlertGroup>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let datasources = self.datasources().await?;
        info!(
            source = %self.name,
            datasources = datasources.len(),
            "fetching rules from datasources"
        );

        // Any failing datasource fails the whole call.
        let per_datasource =
            try_join_all(datasources.iter().map(|ds| self.datasource_rules(ds))).await?;
        Ok(per_datasource.into_iter().flatten().collect())
    }
}
