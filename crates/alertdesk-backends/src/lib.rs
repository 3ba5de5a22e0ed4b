//! Backend adapters for alertdesk.
//!
//! Each monitoring system is reached through one of three capabilities:
//!
//! - [`AlertSource`]: reads alerting rule groups (Grafana-managed rules, or
//!   Prometheus-compatible datasources proxied by Grafana)
//! - [`SilenceManager`]: lists, creates and expires silences through the
//!   Alertmanager v2 API (Grafana's built-in Alertmanager or a standalone one)
//! - [`DashboardSource`]: searches Grafana dashboards and panels
//!
//! The concrete adapters are closed enums ([`AlertBackend`],
//! [`SilenceBackend`]) assembled into a [`Backends`] table from
//! [`BackendsConfig`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod dashboards;
pub mod error;
pub mod grafana;
pub mod http;
pub mod registry;
pub mod rules;
pub mod silences;

pub use config::{
    AlertingConfig, AlertmanagerConfig, Auth, BackendsConfig, DEFAULT_MUTE_DURATIONS,
    DashboardsConfig, DatasourceRulesConfig, GRAFANA_NAME, GrafanaConfig, GrafanaSilencesConfig,
    parse_mute_durations,
};
pub use dashboards::{Dashboard, DashboardSource, GrafanaDashboards, Panel};
pub use error::{BackendError, Result};
pub use grafana::{Datasource, DatasourceRules, GrafanaRules};
pub use http::ApiClient;
pub use registry::Backends;
pub use rules::{AlertBackend, AlertSource, RulesResponse};
pub use silences::{
    ALERTMANAGER_PREFIX, AlertmanagerApi, GRAFANA_AM_PREFIX, SilenceBackend, SilenceManager,
};
