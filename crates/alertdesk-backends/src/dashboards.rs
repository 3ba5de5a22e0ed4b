//! Grafana dashboards and panels.

use std::future::Future;

use alertdesk_core::Named;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::http::ApiClient;

const SEARCH_PATH: &str = "/api/search?type=dash-db";
const RENDER_SIZE: &str = "width=1000&height=500";

/// A dashboard search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Dashboard UID.
    pub uid: String,
    /// Title.
    pub title: String,
    /// Path relative to the Grafana root, e.g. `/d/abc/node-exporter`.
    #[serde(default)]
    pub url: String,
    /// Folder title, empty for the general folder.
    #[serde(default, rename = "folderTitle")]
    pub folder: String,
}

impl Named for Dashboard {
    fn lookup_name(&self) -> String {
        self.title.clone()
    }
}

/// A panel of a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel {
    /// Panel ID, unique within its dashboard.
    pub id: u64,
    /// Panel title.
    pub title: String,
    /// Visualization type.
    pub kind: String,
    /// Owning dashboard UID.
    pub dashboard_uid: String,
    /// Owning dashboard title.
    pub dashboard_title: String,
}

impl Named for Panel {
    fn lookup_name(&self) -> String {
        format!("{}{}", self.dashboard_title, self.title)
    }
}

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    dashboard: DashboardModel,
}

#[derive(Debug, Deserialize)]
struct DashboardModel {
    uid: String,
    title: String,
    #[serde(default)]
    panels: Vec<PanelModel>,
}

#[derive(Debug, Deserialize)]
struct PanelModel {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "type")]
    kind: String,
    // Collapsed rows carry their children here.
    #[serde(default)]
    panels: Vec<PanelModel>,
}

fn flatten_panels(models: Vec<PanelModel>, uid: &str, title: &str, out: &mut Vec<Panel>) {
    for model in models {
        let PanelModel {
            id,
            title: panel_title,
            kind,
            panels,
        } = model;
        if let Some(id) = id.filter(|_| kind != "row") {
            out.push(Panel {
                id,
                title: panel_title,
                kind,
                dashboard_uid: uid.to_string(),
                dashboard_title: title.to_string(),
            });
        }
        flatten_panels(panels, uid, title, out);
    }
}

/// A backend that lists dashboards and their panels.
pub trait DashboardSource: Send + Sync {
    /// Whether dashboards are switched on.
    fn enabled(&self) -> bool;

    /// Lists dashboards in backend order.
    fn list_dashboards(&self) -> impl Future<Output = Result<Vec<Dashboard>>> + Send;

    /// Lists the panels of one dashboard, rows flattened.
    fn list_panels(&self, uid: &str) -> impl Future<Output = Result<Vec<Panel>>> + Send;

    /// Link that opens a dashboard.
    fn dashboard_link(&self, dashboard: &Dashboard) -> String;

    /// Link that opens a single panel.
    fn panel_link(&self, panel: &Panel) -> String;

    /// Link to a rendered PNG of a single panel.
    fn panel_render_link(&self, panel: &Panel) -> String;
}

/// Grafana's search and dashboard APIs.
#[derive(Debug, Clone)]
pub struct GrafanaDashboards {
    client: ApiClient,
    public_url: String,
    enabled: bool,
}

impl GrafanaDashboards {
    /// Creates the source. Links use `public_url` when given, otherwise the
    /// API base URL.
    #[must_use]
    pub fn new(client: ApiClient, public_url: Option<&str>, enabled: bool) -> Self {
        let public_url = public_url
            .unwrap_or_else(|| client.base_url())
            .trim_end_matches('/')
            .to_string();
        Self {
            client,
            public_url,
            enabled,
        }
    }

    fn check_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(BackendError::Disabled {
                backend: "Dashboards".to_string(),
            })
        }
    }
}

impl DashboardSource for GrafanaDashboards {
    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn list_dashboards(&self) -> Result<Vec<Dashboard>> {
        self.check_enabled()?;
        let dashboards: Vec<Dashboard> = self.client.get_json(SEARCH_PATH).await?;
        debug!(dashboards = dashboards.len(), "fetched dashboards");
        Ok(dashboards)
    }

    async fn list_panels(&self, uid: &str) -> Result<Vec<Panel>> {
        self.check_enabled()?;
        if uid.is_empty() || !uid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(BackendError::InvalidId {
                backend: self.client.backend().to_string(),
                id: uid.to_string(),
            });
        }

        let response: DashboardResponse = self
            .client
            .get_json(&format!("/api/dashboards/uid/{uid}"))
            .await?;
        let DashboardModel { uid, title, panels } = response.dashboard;
        let mut out = Vec::new();
        flatten_panels(panels, &uid, &title, &mut out);
        Ok(out)
    }

    fn dashboard_link(&self, dashboard: &Dashboard) -> String {
        if dashboard.url.is_empty() {
            format!("{}/d/{}", self.public_url, dashboard.uid)
        } else {
            format!("{}{}", self.public_url, dashboard.url)
        }
    }

    fn panel_link(&self, panel: &Panel) -> String {
        format!(
            "{}/d/{}?viewPanel={}",
            self.public_url, panel.dashboard_uid, panel.id
        )
    }

    fn panel_render_link(&self, panel: &Panel) -> String {
        format!(
            "{}/render/d-solo/{}?panelId={}&{RENDER_SIZE}",
            self.public_url, panel.dashboard_uid, panel.id
        )
    }
}
