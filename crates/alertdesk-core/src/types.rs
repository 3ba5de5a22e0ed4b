//! Core types for the alerting model.
//!
//! This module provides the read-only rule snapshots and the silence model:
//! - [`RuleState`]: Aggregate state of a rule or an alert instance
//! - [`Alert`]: One alert instance with its label set
//! - [`AlertRule`] / [`AlertGroup`]: Rule snapshots as served by a rules API
//! - [`Silence`]: A silence, before or after submission to a backend
//! - [`MatchingAlert`]: An alert reported by a silence backend's alerts API

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};
use crate::matcher::{ALERTNAME_LABEL, Matcher};

/// The aggregate state of a rule or alert instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    /// The condition is not met.
    #[default]
    Inactive,
    /// The condition is met but has not held long enough to fire.
    Pending,
    /// The alert is firing.
    Firing,
}

impl RuleState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Firing => "firing",
        }
    }

    /// Maps a backend state string onto the three-state model.
    ///
    /// Prometheus reports `firing`/`pending`/`inactive`; Grafana reports
    /// instance states such as `Alerting`, `Alerting (NoData)` or `Normal`.
    #[must_use]
    pub fn from_api(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        if lower.starts_with("firing") || lower.starts_with("alerting") {
            Self::Firing
        } else if lower.starts_with("pending") {
            Self::Pending
        } else {
            Self::Inactive
        }
    }

    /// Returns true for pending or firing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Firing)
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_api(&raw))
    }
}

/// Alert values arrive as strings (`"1e+00"`, `"+Inf"`) or plain numbers.
fn deserialize_value<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => n,
        Some(Raw::Text(s)) => s.trim().parse().unwrap_or(f64::NAN),
        None => f64::NAN,
    })
}

/// A single alert instance of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Label set identifying the instance.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations attached by the rule.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Current state.
    #[serde(default)]
    pub state: RuleState,
    /// Value of the alert expression at last evaluation.
    #[serde(default, deserialize_with = "deserialize_value")]
    pub value: f64,
    /// When the instance became active.
    #[serde(default)]
    pub active_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Creates an instance from a label set.
    #[must_use]
    pub fn new(labels: BTreeMap<String, String>, state: RuleState) -> Self {
        Self {
            labels,
            annotations: BTreeMap::new(),
            state,
            value: f64::NAN,
            active_at: None,
        }
    }

    /// Stable fingerprint of the label set.
    ///
    /// The first 16 hex characters of a BLAKE3 digest over the sorted labels.
    /// Stable across processes so it can travel inside workflow tokens.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint_labels(&self.labels)
    }

    /// Returns the `alertname` label if present.
    #[must_use]
    pub fn alertname(&self) -> Option<&str> {
        self.labels.get(ALERTNAME_LABEL).map(String::as_str)
    }
}

/// Computes the fingerprint of a label set.
#[must_use]
pub fn fingerprint_labels(labels: &BTreeMap<String, String>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (k, v) in labels {
        hasher.update(k.as_bytes());
        hasher.update(&[0xff]);
        hasher.update(v.as_bytes());
        hasher.update(&[0xfe]);
    }
    hasher.finalize().to_hex().as_str()[..16].to_string()
}

fn default_rule_type() -> String {
    "alerting".to_string()
}

/// An alerting rule snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule name (also the `alertname` of its alerts).
    pub name: String,
    /// Aggregate state.
    #[serde(default)]
    pub state: RuleState,
    /// Rule type (`alerting` or `recording`).
    #[serde(rename = "type", default = "default_rule_type")]
    pub rule_type: String,
    /// Static labels of the rule.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations of the rule.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Alert instances in backend order.
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl AlertRule {
    /// Whether this is an alerting (not recording) rule.
    #[must_use]
    pub fn is_alerting(&self) -> bool {
        self.rule_type.eq_ignore_ascii_case("alerting")
    }

    /// Instances a silence can be created for.
    ///
    /// Pending and firing instances in order; when there are none, a single
    /// synthetic instance built from the rule labels plus `alertname`.
    #[must_use]
    pub fn silence_candidates(&self) -> Vec<Alert> {
        let active: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| a.state.is_active())
            .cloned()
            .collect();
        if !active.is_empty() {
            return active;
        }

        let mut labels = self.labels.clone();
        labels.insert(ALERTNAME_LABEL.to_string(), self.name.clone());
        vec![Alert::new(labels, self.state)]
    }

    /// Number of firing instances.
    #[must_use]
    pub fn firing_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.state == RuleState::Firing)
            .count()
    }
}

/// A rule group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertGroup {
    /// Group name.
    pub name: String,
    /// Source file or folder identifier.
    #[serde(default)]
    pub file: String,
    /// Rules in backend order.
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

/// State of a silence as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SilenceState {
    /// Currently muting alerts.
    Active,
    /// Past its end time or deleted.
    Expired,
    /// Starts in the future.
    Pending,
}

impl SilenceState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for SilenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-assigned status block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceStatus {
    /// Lifecycle state.
    pub state: SilenceState,
}

/// A silence in the Alertmanager v2 wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Silence {
    /// Backend-assigned identifier, absent before creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Who created the silence.
    #[serde(default)]
    pub created_by: String,
    /// Free-text comment.
    #[serde(default)]
    pub comment: String,
    /// When the silence starts.
    pub starts_at: DateTime<Utc>,
    /// When the silence ends.
    pub ends_at: DateTime<Utc>,
    /// Backend-assigned status, absent before creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SilenceStatus>,
    /// Label matchers; all must match.
    #[serde(default)]
    pub matchers: Vec<Matcher>,
}

impl Silence {
    /// Creates a silence starting at `starts_at` and lasting `duration`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidSilence` if there are no matchers or the
    /// duration is zero, and `CoreError::InvalidRegex` for a regex matcher
    /// that does not compile.
    pub fn new(
        matchers: Vec<Matcher>,
        starts_at: DateTime<Utc>,
        duration: Duration,
        created_by: impl Into<String>,
        comment: impl Into<String>,
    ) -> Result<Self> {
        let out_of_range = || CoreError::InvalidSilence {
            reason: "duration out of range".to_string(),
        };
        let length = chrono::Duration::from_std(duration).map_err(|_| out_of_range())?;
        let ends_at = starts_at
            .checked_add_signed(length)
            .ok_or_else(out_of_range)?;

        let silence = Self {
            id: None,
            created_by: created_by.into(),
            comment: comment.into(),
            starts_at,
            ends_at,
            status: None,
            matchers,
        };
        silence.validate()?;
        Ok(silence)
    }

    /// Checks the silence before submission.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no matchers, the end is not after the
    /// start, or a regex matcher is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.matchers.is_empty() {
            return Err(CoreError::InvalidSilence {
                reason: "a silence needs at least one matcher".to_string(),
            });
        }
        if self.ends_at <= self.starts_at {
            return Err(CoreError::InvalidSilence {
                reason: "silence end time must be after start time".to_string(),
            });
        }
        for matcher in &self.matchers {
            matcher.validate()?;
        }
        Ok(())
    }

    /// Returns the backend state, if the silence has been fetched.
    #[must_use]
    pub fn state(&self) -> Option<SilenceState> {
        self.status.map(|s| s.state)
    }

    /// Whether the backend reports the silence as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == Some(SilenceState::Active)
    }

    /// Whether the backend reports the silence as expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state() == Some(SilenceState::Expired)
    }

    /// Length of the silence.
    #[must_use]
    pub fn duration(&self) -> Duration {
        (self.ends_at - self.starts_at).to_std().unwrap_or_default()
    }

    /// Matchers rendered as a single expression.
    #[must_use]
    pub fn matcher_text(&self) -> String {
        self.matchers
            .iter()
            .map(Matcher::filter_expr)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Status block of an alert reported by a silence backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingAlertStatus {
    /// `active`, `suppressed` or `unprocessed`.
    #[serde(default)]
    pub state: String,
    /// IDs of silences muting the alert.
    #[serde(default)]
    pub silenced_by: Vec<String>,
    /// Fingerprints of alerts inhibiting this one.
    #[serde(default)]
    pub inhibited_by: Vec<String>,
}

/// An alert as reported by an Alertmanager-compatible alerts API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingAlert {
    /// Backend fingerprint.
    #[serde(default)]
    pub fingerprint: String,
    /// Label set.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// When the alert started.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// Status block.
    #[serde(default)]
    pub status: MatchingAlertStatus,
}

impl MatchingAlert {
    /// Returns the `alertname` label if present.
    #[must_use]
    pub fn alertname(&self) -> Option<&str> {
        self.labels.get(ALERTNAME_LABEL).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    mod rule_state_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("firing", RuleState::Firing ; "prometheus firing")]
        #[test_case("Alerting", RuleState::Firing ; "grafana alerting")]
        #[test_case("Alerting (NoData)", RuleState::Firing ; "grafana nodata")]
        #[test_case("pending", RuleState::Pending ; "pending")]
        #[test_case("Normal", RuleState::Inactive ; "grafana normal")]
        #[test_case("inactive", RuleState::Inactive ; "inactive")]
        fn from_api(raw: &str, expected: RuleState) {
            assert_eq!(RuleState::from_api(raw), expected);
        }

        #[test]
        fn active_states() {
            assert!(RuleState::Firing.is_active());
            assert!(RuleState::Pending.is_active());
            assert!(!RuleState::Inactive.is_active());
        }
    }

    mod alert_tests {
        use super::*;

        #[test]
        fn fingerprint_is_stable_and_order_independent() {
            let a = Alert::new(labels(&[("host", "test"), ("alertname", "Down")]), RuleState::Firing);
            let b = Alert::new(labels(&[("alertname", "Down"), ("host", "test")]), RuleState::Pending);
            assert_eq!(a.fingerprint(), b.fingerprint());
            assert_eq!(a.fingerprint().len(), 16);
        }

        #[test]
        fn fingerprint_differs_by_value() {
            let a = Alert::new(labels(&[("host", "a")]), RuleState::Firing);
            let b = Alert::new(labels(&[("host", "b")]), RuleState::Firing);
            assert_ne!(a.fingerprint(), b.fingerprint());
        }

        #[test]
        fn fingerprint_separates_key_value_boundaries() {
            let a = Alert::new(labels(&[("ab", "c")]), RuleState::Firing);
            let b = Alert::new(labels(&[("a", "bc")]), RuleState::Firing);
            assert_ne!(a.fingerprint(), b.fingerprint());
        }

        #[test]
        fn deserialize_prometheus_alert() {
            let json = r#"{
                "labels": {"alertname": "Down", "instance": "h1"},
                "annotations": {"summary": "down"},
                "state": "firing",
                "activeAt": "2024-01-01T00:00:00Z",
                "value": "1e+00"
            }"#;
            let alert: Alert = serde_json::from_str(json).unwrap();
            assert_eq!(alert.state, RuleState::Firing);
            assert!((alert.value - 1.0).abs() < f64::EPSILON);
            assert_eq!(alert.alertname(), Some("Down"));
            assert!(alert.active_at.is_some());
        }

        #[test]
        fn deserialize_numeric_and_garbage_values() {
            let alert: Alert = serde_json::from_str(r#"{"value": 3.5}"#).unwrap();
            assert!((alert.value - 3.5).abs() < f64::EPSILON);

            let alert: Alert = serde_json::from_str(r#"{"value": "n/a"}"#).unwrap();
            assert!(alert.value.is_nan());
        }
    }

    mod rule_tests {
        use super::*;

        fn rule(alerts: Vec<Alert>) -> AlertRule {
            AlertRule {
                name: "HighCPU".to_string(),
                state: RuleState::Firing,
                rule_type: "alerting".to_string(),
                labels: labels(&[("severity", "warning")]),
                annotations: BTreeMap::new(),
                alerts,
            }
        }

        #[test]
        fn candidates_are_active_instances() {
            let r = rule(vec![
                Alert::new(labels(&[("host", "a")]), RuleState::Firing),
                Alert::new(labels(&[("host", "b")]), RuleState::Inactive),
                Alert::new(labels(&[("host", "c")]), RuleState::Pending),
            ]);
            let hosts: Vec<_> = r
                .silence_candidates()
                .iter()
                .map(|a| a.labels["host"].clone())
                .collect();
            assert_eq!(hosts, vec!["a", "c"]);
            assert_eq!(r.firing_count(), 1);
        }

        #[test]
        fn candidates_fall_back_to_rule_labels() {
            let r = rule(vec![]);
            let candidates = r.silence_candidates();
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].alertname(), Some("HighCPU"));
            assert_eq!(candidates[0].labels.get("severity"), Some(&"warning".to_string()));
        }

        #[test]
        fn deserialize_recording_rule() {
            let json = r#"{"name": "job:up:sum", "type": "recording", "health": "ok"}"#;
            let rule: AlertRule = serde_json::from_str(json).unwrap();
            assert!(!rule.is_alerting());
        }

        #[test]
        fn deserialize_group_defaults() {
            let json = r#"{"name": "node", "rules": [{"name": "Down", "state": "pending"}]}"#;
            let group: AlertGroup = serde_json::from_str(json).unwrap();
            assert_eq!(group.file, "");
            assert!(group.rules[0].is_alerting());
            assert_eq!(group.rules[0].state, RuleState::Pending);
        }
    }

    mod silence_tests {
        use super::*;

        #[test]
        fn new_sets_end_from_duration() {
            let start = Utc::now();
            let silence = Silence::new(
                vec![Matcher::equal("host", "test")],
                start,
                Duration::from_secs(7200),
                "ops",
                "maintenance",
            )
            .unwrap();
            assert_eq!(silence.ends_at - silence.starts_at, chrono::Duration::hours(2));
            assert_eq!(silence.duration(), Duration::from_secs(7200));
            assert!(silence.id.is_none());
            assert!(silence.state().is_none());
        }

        #[test]
        fn new_rejects_empty_matchers() {
            let result = Silence::new(vec![], Utc::now(), Duration::from_secs(60), "ops", "x");
            assert!(matches!(result, Err(CoreError::InvalidSilence { .. })));
        }

        #[test]
        fn new_rejects_zero_duration() {
            let result = Silence::new(
                vec![Matcher::equal("a", "b")],
                Utc::now(),
                Duration::ZERO,
                "ops",
                "x",
            );
            assert!(matches!(result, Err(CoreError::InvalidSilence { .. })));
        }

        #[test]
        fn new_rejects_end_past_max_date() {
            let twenty_million_weeks = Duration::from_secs(20_000_000 * 7 * 86_400);
            let result = Silence::new(
                vec![Matcher::equal("host", "a")],
                Utc::now(),
                twenty_million_weeks,
                "ops",
                "x",
            );
            assert!(matches!(result, Err(CoreError::InvalidSilence { .. })));

            let result = Silence::new(
                vec![Matcher::equal("host", "a")],
                Utc::now(),
                Duration::from_secs(u64::MAX),
                "ops",
                "x",
            );
            assert!(matches!(result, Err(CoreError::InvalidSilence { .. })));
        }

        #[test]
        fn new_rejects_bad_regex() {
            let result = Silence::new(
                vec![Matcher::new("job", crate::matcher::MatchOp::RegexMatch, "(")],
                Utc::now(),
                Duration::from_secs(60),
                "ops",
                "x",
            );
            assert!(matches!(result, Err(CoreError::InvalidRegex { .. })));
        }

        #[test]
        fn serialize_omits_id_before_creation() {
            let silence = Silence::new(
                vec![Matcher::equal("host", "test")],
                Utc::now(),
                Duration::from_secs(60),
                "ops",
                "x",
            )
            .unwrap();
            let json = serde_json::to_value(&silence).unwrap();
            assert!(json.get("id").is_none());
            assert!(json.get("status").is_none());
            assert_eq!(json["createdBy"], "ops");
            assert_eq!(json["matchers"][0]["isEqual"], true);
        }

        #[test]
        fn deserialize_backend_silence() {
            let json = r#"{
                "id": "abc",
                "status": {"state": "expired"},
                "createdBy": "ops",
                "comment": "x",
                "startsAt": "2024-01-01T00:00:00Z",
                "endsAt": "2024-01-01T01:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z",
                "matchers": [{"name": "host", "value": "test", "isRegex": false, "isEqual": true}]
            }"#;
            let silence: Silence = serde_json::from_str(json).unwrap();
            assert_eq!(silence.id.as_deref(), Some("abc"));
            assert!(silence.is_expired());
            assert!(!silence.is_active());
            assert_eq!(silence.matcher_text(), r#"host="test""#);
        }
    }

    #[test]
    fn deserialize_matching_alert() {
        let json = r#"{
            "fingerprint": "f00",
            "labels": {"alertname": "Down"},
            "startsAt": "2024-01-01T00:00:00Z",
            "status": {"state": "suppressed", "silencedBy": ["abc"], "inhibitedBy": []},
            "receivers": [{"name": "team"}]
        }"#;
        let alert: MatchingAlert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.alertname(), Some("Down"));
        assert_eq!(alert.status.silenced_by, vec!["abc".to_string()]);
    }
}
