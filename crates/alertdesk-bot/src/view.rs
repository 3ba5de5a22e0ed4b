//! Views: the data behind every reply.
//!
//! Workflows produce a [`View`]; a [`Renderer`](crate::render::Renderer)
//! turns it into message text. Views serialize to JSON so alternative
//! renderers can live outside the process.

use alertdesk_core::{Alert, AlertRule, MatchingAlert, Page, Silence};
use serde::Serialize;

use crate::aggregate::SilenceWithAlerts;

/// A rule shown in the alerts listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRow {
    /// Alert source the rule came from.
    pub source: String,
    /// Rule group.
    pub group: String,
    /// The rule.
    pub rule: AlertRule,
}

/// A link to a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardLink {
    /// Dashboard title.
    pub title: String,
    /// Folder title.
    pub folder: String,
    /// URL.
    pub link: String,
}

/// A link to a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelLink {
    /// Panel title.
    pub title: String,
    /// URL opening the panel.
    pub link: String,
}

/// A configured backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    /// Display name.
    pub name: String,
    /// Whether it is switched on.
    pub enabled: bool,
    /// Silence manager used for its alerts (alert sources only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silences: Option<String>,
}

/// Everything the bot can show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Command overview.
    Help {
        /// `(command, description)` pairs.
        commands: Vec<(String, String)>,
    },
    /// Firing and pending rules across all sources.
    Alerts {
        /// Current page.
        page: Page<AlertRow>,
    },
    /// One rule in detail.
    AlertDetail {
        /// The rule and where it lives.
        row: AlertRow,
    },
    /// Instances of a rule to pick a silence for.
    ChooseAlert {
        /// Rule name.
        rule: String,
        /// Silence manager that will hold the silence.
        manager: String,
        /// Instances, one button row each.
        candidates: Vec<Alert>,
    },
    /// A silence was created.
    SilenceCreated {
        /// Silence manager.
        manager: String,
        /// The silence as stored by the backend.
        silence: Silence,
        /// Alerts it mutes right now.
        alerts: Vec<MatchingAlert>,
    },
    /// Pick a silence manager.
    ChooseManager {
        /// Enabled manager names.
        managers: Vec<String>,
    },
    /// Active silences of one manager.
    Silences {
        /// Silence manager.
        manager: String,
        /// Current page.
        page: Page<SilenceWithAlerts>,
    },
    /// A silence was expired.
    Unsilenced {
        /// Silence manager.
        manager: String,
        /// The silence before deletion.
        silence: Silence,
    },
    /// The silence had already expired; nothing was deleted.
    AlreadyDeleted {
        /// Silence manager.
        manager: String,
        /// Silence ID.
        id: String,
    },
    /// Dashboards matching a query.
    Dashboards {
        /// The query as typed.
        query: String,
        /// Current page.
        page: Page<DashboardLink>,
    },
    /// One dashboard and its panels.
    Dashboard {
        /// The dashboard.
        dashboard: DashboardLink,
        /// Panels in layout order.
        panels: Vec<PanelLink>,
    },
    /// One panel.
    Panel {
        /// Owning dashboard title.
        dashboard: String,
        /// The panel.
        panel: PanelLink,
        /// Rendered image URL.
        render_link: String,
    },
    /// The backend table.
    Backends {
        /// Alert sources.
        sources: Vec<BackendStatus>,
        /// Silence managers.
        managers: Vec<BackendStatus>,
        /// Whether dashboards are available, when Grafana is configured.
        #[serde(skip_serializing_if = "Option::is_none")]
        dashboards: Option<bool>,
    },
}
