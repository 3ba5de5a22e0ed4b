//! In-process fake backends for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alertdesk_backends::{
    AlertSource, BackendError, Backends, Dashboard, DashboardSource, Panel, Result,
    SilenceManager,
};
use alertdesk_core::{
    Alert, AlertGroup, AlertRule, MatchingAlert, MatchingAlertStatus, RuleState, Silence,
    SilenceState, SilenceStatus, parse_matchers,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use crate::config::BotSettings;
use crate::context::AppContext;
use crate::keyboard::Keyboard;
use crate::view::View;
use crate::workflow::Reply;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// A firing rule with one firing instance per label set.
pub fn rule(name: &str, instances: &[&[(&str, &str)]]) -> AlertRule {
    AlertRule {
        name: name.to_string(),
        state: RuleState::Firing,
        rule_type: "alerting".to_string(),
        labels: BTreeMap::new(),
        annotations: BTreeMap::from([("summary".to_string(), format!("{name} is firing"))]),
        alerts: instances
            .iter()
            .map(|pairs| {
                let mut labels = labels(pairs);
                labels.insert("alertname".to_string(), name.to_string());
                Alert::new(labels, RuleState::Firing)
            })
            .collect(),
    }
}

/// A group holding `rules`.
pub fn group(name: &str, rules: Vec<AlertRule>) -> AlertGroup {
    AlertGroup {
        name: name.to_string(),
        file: format!("{name}.yml"),
        rules,
    }
}

/// A two-hour silence in the given state.
pub fn silence(id: &str, state: &str, matchers: &str) -> Silence {
    let starts_at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let mut silence = Silence::new(
        parse_matchers(matchers),
        starts_at,
        Duration::from_secs(7200),
        "ops",
        "maintenance",
    )
    .unwrap();
    silence.id = Some(id.to_string());
    silence.status = Some(SilenceStatus {
        state: match state {
            "expired" => SilenceState::Expired,
            "pending" => SilenceState::Pending,
            _ => SilenceState::Active,
        },
    });
    silence
}

fn status_error(backend: &str, status: u16, body: &str) -> BackendError {
    BackendError::Status {
        backend: backend.to_string(),
        status,
        body: body.to_string(),
    }
}

/// An alert source serving fixed groups.
#[derive(Debug)]
pub struct FakeSource {
    name: String,
    enabled: bool,
    groups: Vec<AlertGroup>,
    failing: bool,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn new(name: &str, groups: Vec<AlertGroup>) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            groups,
            failing: false,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl AlertSource for FakeSource {
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
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(status_error(&self.name, 502, "bad gateway"));
        }
        Ok(self.groups.clone())
    }
}

/// A silence manager keeping silences in memory.
#[derive(Debug)]
pub struct FakeManager {
    name: String,
    enabled: bool,
    mute_durations: Vec<Duration>,
    silences: Mutex<Vec<Silence>>,
    created: Mutex<Vec<Silence>>,
    deleted: Mutex<Vec<String>>,
    failing_matches: Option<String>,
    match_delays: BTreeMap<String, Duration>,
    match_queries: AtomicUsize,
    answered: Mutex<Vec<String>>,
}

impl FakeManager {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            mute_durations: vec![Duration::from_secs(3600), Duration::from_secs(4 * 3600)],
            silences: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            failing_matches: None,
            match_delays: BTreeMap::new(),
            match_queries: AtomicUsize::new(0),
            answered: Mutex::new(Vec::new()),
        }
    }

    pub fn with_silences(self, silences: Vec<Silence>) -> Self {
        *self.silences.lock() = silences;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn failing_matches_for(mut self, id: &str) -> Self {
        self.failing_matches = Some(id.to_string());
        self
    }

    /// Delays the matching-alerts answer for silence `id`.
    pub fn with_match_delay(mut self, id: &str, delay: Duration) -> Self {
        self.match_delays.insert(id.to_string(), delay);
        self
    }

    /// Silence IDs in the order their matching-alerts queries finished.
    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().clone()
    }

    pub fn created(&self) -> Vec<Silence> {
        self.created.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn match_queries(&self) -> usize {
        self.match_queries.load(Ordering::SeqCst)
    }

    fn check_enabled(&self) -> Result<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(BackendError::Disabled {
                backend: self.name.clone(),
            })
        }
    }
}

impl SilenceManager for FakeManager {
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
        Ok(self.silences.lock().clone())
    }

    async fn get_silence(&self, id: &str) -> Result<Silence> {
        self.check_enabled()?;
        self.silences
            .lock()
            .iter()
            .find(|s| s.id.as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| status_error(&self.name, 404, "silence not found"))
    }

    async fn create_silence(&self, silence: &Silence) -> Result<String> {
        self.check_enabled()?;
        silence.validate()?;
        let id = uuid::Uuid::new_v4().to_string();
        let mut stored = silence.clone();
        stored.id = Some(id.clone());
        stored.status = Some(SilenceStatus {
            state: SilenceState::Active,
        });
        self.created.lock().push(silence.clone());
        self.silences.lock().push(stored);
        Ok(id)
    }

    async fn delete_silence(&self, id: &str) -> Result<()> {
        self.check_enabled()?;
        self.deleted.lock().push(id.to_string());
        if let Some(s) = self
            .silences
            .lock()
            .iter_mut()
            .find(|s| s.id.as_deref() == Some(id))
        {
            s.status = Some(SilenceStatus {
                state: SilenceState::Expired,
            });
        }
        Ok(())
    }

    async fn get_silence_matching_alerts(&self, silence: &Silence) -> Result<Vec<MatchingAlert>> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        self.match_queries.fetch_add(1, Ordering::SeqCst);
        let id = silence.id.clone().unwrap_or_default();
        match self.match_delays.get(&id) {
            Some(delay) => tokio::time::sleep(*delay).await,
            // Let other row tasks interleave.
            None => tokio::task::yield_now().await,
        }
        self.answered.lock().push(id);
        if silence.id.is_some() && silence.id == self.failing_matches {
            return Err(status_error(&self.name, 500, "alerts query failed"));
        }
        let labels = silence
            .matchers
            .iter()
            .filter(|m| m.is_equal && !m.is_regex)
            .map(|m| (m.name.clone(), m.value.clone()))
            .collect();
        Ok(vec![MatchingAlert {
            fingerprint: "fake".to_string(),
            labels,
            annotations: BTreeMap::new(),
            starts_at: None,
            status: MatchingAlertStatus::default(),
        }])
    }
}

/// A dashboard source serving fixed dashboards.
#[derive(Debug, Default)]
pub struct FakeDashboards {
    dashboards: Vec<Dashboard>,
    panels: BTreeMap<String, Vec<Panel>>,
    panel_fetches: AtomicUsize,
}

impl FakeDashboards {
    pub fn with_dashboard(mut self, uid: &str, title: &str, panels: &[&str]) -> Self {
        self.dashboards.push(Dashboard {
            uid: uid.to_string(),
            title: title.to_string(),
            url: format!("/d/{uid}"),
            folder: String::new(),
        });
        self.panels.insert(
            uid.to_string(),
            panels
                .iter()
                .enumerate()
                .map(|(idx, panel)| Panel {
                    id: idx as u64 + 1,
                    title: (*panel).to_string(),
                    kind: "timeseries".to_string(),
                    dashboard_uid: uid.to_string(),
                    dashboard_title: title.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn panel_fetches(&self) -> usize {
        self.panel_fetches.load(Ordering::SeqCst)
    }
}

impl DashboardSource for FakeDashboards {
    fn enabled(&self) -> bool {
        true
    }

    async fn list_dashboards(&self) -> Result<Vec<Dashboard>> {
        Ok(self.dashboards.clone())
    }

    async fn list_panels(&self, uid: &str) -> Result<Vec<Panel>> {
        self.panel_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.panels.get(uid).cloned().unwrap_or_default())
    }

    fn dashboard_link(&self, dashboard: &Dashboard) -> String {
        format!("http://grafana{}", dashboard.url)
    }

    fn panel_link(&self, panel: &Panel) -> String {
        format!("http://grafana/d/{}?viewPanel={}", panel.dashboard_uid, panel.id)
    }

    fn panel_render_link(&self, panel: &Panel) -> String {
        format!(
            "http://grafana/render/d-solo/{}?panelId={}",
            panel.dashboard_uid, panel.id
        )
    }
}

/// Test context type.
pub type FakeContext = AppContext<FakeSource, FakeManager, FakeDashboards>;

/// Builds a context over fakes with default settings.
pub fn context(
    sources: Vec<FakeSource>,
    managers: Vec<FakeManager>,
    dashboards: Option<FakeDashboards>,
) -> FakeContext {
    AppContext::new(
        BotSettings::default(),
        Backends {
            sources,
            silencers: managers.into_iter().map(std::sync::Arc::new).collect(),
            dashboards,
            pairings: BTreeMap::new(),
        },
    )
}

/// Splits a view reply, failing the test on a keyboard-only reply.
pub fn view_and_keyboard(reply: Reply) -> (View, Keyboard) {
    match reply {
        Reply::View { view, keyboard } => (view, keyboard),
        Reply::Keyboard(_) => panic!("expected a view"),
    }
}
