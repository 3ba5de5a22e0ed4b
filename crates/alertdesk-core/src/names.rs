//! Loose name lookup for rules, dashboards and panels.
//!
//! Names are compared after [`normalize`]; a candidate matches when its
//! normalized name contains the normalized query. The first match in
//! iteration order wins, so callers must pass collections in the order the
//! backend returned them.

use crate::types::{AlertGroup, AlertRule};

/// Lower-cases and drops every character outside `[a-zA-Z0-9]`.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Something that can be found by a loose name query.
pub trait Named {
    /// The raw name used for lookup, before normalization.
    fn lookup_name(&self) -> String;

    /// Whether this entity matches an already-normalized query.
    fn matches_normalized(&self, query: &str) -> bool {
        normalize(&self.lookup_name()).contains(query)
    }
}

/// Returns the first item whose normalized name contains the normalized query.
pub fn find_by_name<'a, T, I>(items: I, query: &str) -> Option<&'a T>
where
    T: Named + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let query = normalize(query);
    items.into_iter().find(|item| item.matches_normalized(&query))
}

/// Returns every item whose normalized name contains the normalized query.
pub fn filter_by_name<'a, T, I>(items: I, query: &str) -> Vec<&'a T>
where
    T: Named + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let query = normalize(query);
    items
        .into_iter()
        .filter(|item| item.matches_normalized(&query))
        .collect()
}

/// A rule together with the group that owns it.
#[derive(Debug, Clone, Copy)]
pub struct RuleRef<'a> {
    /// Owning group.
    pub group: &'a AlertGroup,
    /// The rule.
    pub rule: &'a AlertRule,
}

impl RuleRef<'_> {
    /// Normalized `group + rule` name, the key carried in silence tokens.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        normalize(&self.lookup_name())
    }
}

impl Named for RuleRef<'_> {
    fn lookup_name(&self) -> String {
        format!("{}{}", self.group.name, self.rule.name)
    }
}

/// Flattens groups into rule references in group then rule order.
#[must_use]
pub fn rule_refs(groups: &[AlertGroup]) -> Vec<RuleRef<'_>> {
    groups
        .iter()
        .flat_map(|group| group.rules.iter().map(move |rule| RuleRef { group, rule }))
        .collect()
}

/// Finds the first rule whose `group + rule` name contains the query.
#[must_use]
pub fn find_rule<'a>(groups: &'a [AlertGroup], query: &str) -> Option<RuleRef<'a>> {
    let query = normalize(query);
    groups
        .iter()
        .flat_map(|group| group.rules.iter().map(move |rule| RuleRef { group, rule }))
        .find(|r| r.matches_normalized(&query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuleState;
    use std::collections::BTreeMap;

    struct Title(&'static str);

    impl Named for Title {
        fn lookup_name(&self) -> String {
            self.0.to_string()
        }
    }

    fn rule(name: &str) -> AlertRule {
        AlertRule {
            name: name.to_string(),
            state: RuleState::Firing,
            rule_type: "alerting".to_string(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            alerts: vec![],
        }
    }

    fn group(name: &str, rules: &[&str]) -> AlertGroup {
        AlertGroup {
            name: name.to_string(),
            file: "rules.yml".to_string(),
            rules: rules.iter().map(|r| rule(r)).collect(),
        }
    }

    #[test]
    fn normalize_strips_non_ascii_alnum() {
        assert_eq!(normalize(&format!("{}{}", "group", "ruleNameЁ")), "grouprulename");
        assert_eq!(normalize("Node Exporter / CPU-Usage_2"), "nodeexportercpuusage2");
        assert_eq!(normalize("Ёж"), "");
    }

    #[test]
    fn find_hits_superset_and_misses_disjoint() {
        let groups = vec![group("group", &["ruleNameЁ"])];
        assert!(find_rule(&groups, "rule name").is_some());
        assert!(find_rule(&groups, "grouprulename").is_some());
        assert!(find_rule(&groups, "disk").is_none());
    }

    #[test]
    fn first_match_in_insertion_order_wins() {
        let items = [Title("CPU usage (prod)"), Title("CPU usage (staging)")];
        let found = find_by_name(&items, "cpu usage");
        assert_eq!(found.map(|t| t.0), Some("CPU usage (prod)"));
    }

    #[test]
    fn find_rule_walks_groups_in_order() {
        let groups = vec![group("node", &["Down", "DiskFull"]), group("api", &["Down"])];
        let found = find_rule(&groups, "down").unwrap();
        assert_eq!(found.group.name, "node");
        assert_eq!(found.normalized_name(), "nodedown");

        let found = find_rule(&groups, "apidown").unwrap();
        assert_eq!(found.group.name, "api");
    }

    #[test]
    fn empty_query_matches_first() {
        let items = [Title("a"), Title("b")];
        assert_eq!(find_by_name(&items, "  !").map(|t| t.0), Some("a"));
    }

    #[test]
    fn filter_keeps_all_matches_in_order() {
        let items = [Title("Disk IO"), Title("CPU"), Title("disk space")];
        let found: Vec<_> = filter_by_name(&items, "disk").iter().map(|t| t.0).collect();
        assert_eq!(found, vec!["Disk IO", "disk space"]);
    }

    #[test]
    fn rule_refs_flatten_in_order() {
        let groups = vec![group("a", &["x", "y"]), group("b", &["z"])];
        let names: Vec<_> = rule_refs(&groups).iter().map(RuleRef::normalized_name).collect();
        assert_eq!(names, vec!["ax", "ay", "bz"]);
    }
}
