//! Plain-text rendering of views.

use std::fmt::Write;

use alertdesk_core::{Alert, RuleState, Silence, format_duration};

use crate::error::RenderError;
use crate::view::{AlertRow, BackendStatus, View};

/// Turns a view into message text.
pub trait Renderer: Send + Sync {
    /// Renders `view`.
    ///
    /// # Errors
    ///
    /// Returns an error if the view cannot be rendered.
    fn render(&self, view: &View) -> Result<String, RenderError>;
}

/// Renders views as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

fn state_marker(state: RuleState) -> &'static str {
    match state {
        RuleState::Firing => "[FIRING]",
        RuleState::Pending => "[PENDING]",
        RuleState::Inactive => "[OK]",
    }
}

fn labels_line(alert: &Alert) -> String {
    alert
        .labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn page_footer(out: &mut String, page: usize, total_pages: usize) -> std::fmt::Result {
    if total_pages > 1 {
        writeln!(out, "\nPage {} of {total_pages}", page + 1)?;
    }
    Ok(())
}

fn silence_block(out: &mut String, silence: &Silence) -> std::fmt::Result {
    writeln!(out, "ID: {}", silence.id.as_deref().unwrap_or("-"))?;
    writeln!(out, "Matchers: {}", silence.matcher_text())?;
    writeln!(
        out,
        "Ends: {} ({})",
        silence.ends_at.format(TIME_FORMAT),
        format_duration(silence.duration())
    )?;
    if !silence.created_by.is_empty() {
        writeln!(out, "By: {}", silence.created_by)?;
    }
    if !silence.comment.is_empty() {
        writeln!(out, "Comment: {}", silence.comment)?;
    }
    Ok(())
}

fn alert_row(out: &mut String, row: &AlertRow) -> std::fmt::Result {
    let rule = &row.rule;
    write!(out, "{} {} ({}/{})", state_marker(rule.state), rule.name, row.source, row.group)?;
    let firing = rule.firing_count();
    if firing > 0 {
        write!(out, ", {firing} firing")?;
    }
    writeln!(out)
}

fn backend_line(out: &mut String, status: &BackendStatus) -> std::fmt::Result {
    write!(
        out,
        "  {} ({})",
        status.name,
        if status.enabled { "enabled" } else { "disabled" }
    )?;
    if let Some(silences) = &status.silences {
        write!(out, ", silences: {silences}")?;
    }
    writeln!(out)
}

impl TextRenderer {
    fn write_view(out: &mut String, view: &View) -> std::fmt::Result {
        match view {
            View::Help { commands } => {
                writeln!(out, "Available commands:")?;
                for (command, description) in commands {
                    writeln!(out, "{command} - {description}")?;
                }
            }
            View::Alerts { page } => {
                if page.total_items == 0 {
                    writeln!(out, "No firing or pending alerts.")?;
                } else {
                    writeln!(out, "Alerts ({}):", page.total_items)?;
                    for row in &page.items {
                        alert_row(out, row)?;
                    }
                }
                page_footer(out, page.page, page.total_pages)?;
            }
            View::AlertDetail { row } => {
                let rule = &row.rule;
                writeln!(out, "{} {}", state_marker(rule.state), rule.name)?;
                writeln!(out, "Source: {} / {}", row.source, row.group)?;
                for (key, value) in &rule.annotations {
                    writeln!(out, "{key}: {value}")?;
                }
                if !rule.alerts.is_empty() {
                    writeln!(out, "\nInstances:")?;
                    for alert in &rule.alerts {
                        writeln!(out, "{} {}", state_marker(alert.state), labels_line(alert))?;
                    }
                }
            }
            View::ChooseAlert {
                rule,
                manager,
                candidates,
            } => {
                writeln!(out, "Silence {rule} on {manager}. Pick an instance and duration:")?;
                for (idx, alert) in candidates.iter().enumerate() {
                    writeln!(out, "{}. {}", idx + 1, labels_line(alert))?;
                }
            }
            View::SilenceCreated {
                manager,
                silence,
                alerts,
            } => {
                writeln!(out, "Silence created on {manager}.")?;
                silence_block(out, silence)?;
                if alerts.is_empty() {
                    writeln!(out, "No alerts currently match.")?;
                } else {
                    writeln!(out, "Muting {} alert(s):", alerts.len())?;
                    for alert in alerts {
                        writeln!(out, "  {}", alert.alertname().unwrap_or(&alert.fingerprint))?;
                    }
                }
            }
            View::ChooseManager { managers } => {
                writeln!(out, "Choose a silence manager ({}):", managers.len())?;
            }
            View::Silences { manager, page } => {
                if page.total_items == 0 {
                    writeln!(out, "No active silences on {manager}.")?;
                } else {
                    writeln!(out, "Active silences on {manager} ({}):", page.total_items)?;
                    for (idx, row) in page.items.iter().enumerate() {
                        writeln!(out, "\n{}.", page.offset() + idx + 1)?;
                        silence_block(out, &row.silence)?;
                        writeln!(out, "Matching alerts: {}", row.alerts.len())?;
                    }
                }
                page_footer(out, page.page, page.total_pages)?;
            }
            View::Unsilenced { manager, silence } => {
                writeln!(out, "Silence deleted from {manager}.")?;
                silence_block(out, silence)?;
            }
            View::AlreadyDeleted { manager, id } => {
                writeln!(out, "Silence {id} on {manager} is already deleted.")?;
            }
            View::Dashboards { query, page } => {
                if page.total_items == 0 {
                    if query.is_empty() {
                        writeln!(out, "No dashboards.")?;
                    } else {
                        writeln!(out, "No dashboards match '{query}'.")?;
                    }
                } else {
                    writeln!(out, "Dashboards ({}):", page.total_items)?;
                    for dashboard in &page.items {
                        if dashboard.folder.is_empty() {
                            writeln!(out, "{}: {}", dashboard.title, dashboard.link)?;
                        } else {
                            writeln!(
                                out,
                                "{} / {}: {}",
                                dashboard.folder, dashboard.title, dashboard.link
                            )?;
                        }
                    }
                }
                page_footer(out, page.page, page.total_pages)?;
            }
            View::Dashboard { dashboard, panels } => {
                writeln!(out, "{}\n{}", dashboard.title, dashboard.link)?;
                if !panels.is_empty() {
                    writeln!(out, "\nPanels:")?;
                    for panel in panels {
                        writeln!(out, "  {}: {}", panel.title, panel.link)?;
                    }
                }
            }
            View::Panel {
                dashboard,
                panel,
                render_link,
            } => {
                writeln!(out, "{dashboard} / {}", panel.title)?;
                writeln!(out, "{}", panel.link)?;
                writeln!(out, "Image: {render_link}")?;
            }
            View::Backends {
                sources,
                managers,
                dashboards,
            } => {
                writeln!(out, "Alert sources:")?;
                for status in sources {
                    backend_line(out, status)?;
                }
                writeln!(out, "Silence managers:")?;
                for status in managers {
                    backend_line(out, status)?;
                }
                if let Some(enabled) = dashboards {
                    writeln!(
                        out,
                        "Dashboards: {}",
                        if *enabled { "enabled" } else { "disabled" }
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl Renderer for TextRenderer {
    fn render(&self, view: &View) -> Result<String, RenderError> {
        let mut out = String::new();
        Self::write_view(&mut out, view)?;
        Ok(out.trim_end().to_string())
    }
}
