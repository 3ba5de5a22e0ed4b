//! Read-only listings: help, alerts, silences and the backend table.

use std::sync::Arc;

use alertdesk_backends::{AlertSource, DashboardSource, SilenceManager};
use alertdesk_core::{AlertRule, paginate};

use super::{Reply, fetch_rules, lookup_rule};
use crate::aggregate::aggregate_page;
use crate::context::AppContext;
use crate::error::{BotError, BotResult};
use crate::keyboard::{Button, Keyboard};
use crate::token::Token;
use crate::view::{AlertRow, BackendStatus, View};

/// Feature name used when no silence manager is enabled.
pub const SILENCES_FEATURE: &str = "Silence management";

/// Commands listed by `/help`.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/alerts", "firing and pending alerts"),
    ("/alert <name>", "details of one alert rule"),
    ("/silences", "active silences"),
    ("/silence [@manager] <duration> <matchers>", "create a silence"),
    ("/unsilence <id|matchers>", "delete a silence"),
    ("/dashboards [query]", "search dashboards"),
    ("/dashboard <name>", "dashboard panels"),
    ("/panel <name>", "link to one panel"),
    ("/backends", "configured backends"),
    ("/help", "this message"),
];

/// `/start`, `/help`
pub fn help() -> Reply {
    Reply::view(View::Help {
        commands: COMMANDS
            .iter()
            .map(|(command, description)| ((*command).to_string(), (*description).to_string()))
            .collect(),
    })
}

/// `/alerts`, `al_p|<page>`
pub async fn alerts<A, S, D>(ctx: &AppContext<A, S, D>, page: usize) -> BotResult<Reply>
where
    A: AlertSource,
{
    let rows: Vec<AlertRow> = fetch_rules(ctx)
        .await?
        .into_iter()
        .flat_map(|source| {
            let name = source.source;
            source.groups.into_iter().flat_map(move |group| {
                let source = name.clone();
                let group_name = group.name;
                group
                    .rules
                    .into_iter()
                    .filter(|rule| rule.state.is_active())
                    .map(move |rule| AlertRow {
                        source: source.clone(),
                        group: group_name.clone(),
                        rule,
                    })
            })
        })
        .collect();

    let page = paginate(&rows, page, ctx.settings.per_page);
    let mut keyboard = Keyboard::new();
    for row in &page.items {
        keyboard.push_row(vec![silence_button(&row.group, &row.rule)?]);
    }
    keyboard.push_pagination(&page, |page| Token::AlertsPage { page })?;

    Ok(Reply::with_keyboard(View::Alerts { page }, keyboard))
}

fn silence_button(group: &str, rule: &AlertRule) -> Result<Button, crate::error::TokenError> {
    Button::new(
        format!("Silence {}", rule.name),
        &Token::choose_alert(&format!("{group}{}", rule.name)),
    )
}

/// `/alert <name>`
pub async fn alert_detail<A, S, D>(ctx: &AppContext<A, S, D>, name: &str) -> BotResult<Reply>
where
    A: AlertSource,
{
    if name.trim().is_empty() {
        return Err(BotError::usage("Usage: /alert <name>"));
    }

    let rules = fetch_rules(ctx).await?;
    let (source, found) = lookup_rule(&rules, name)
        .ok_or_else(|| BotError::not_found(format!("Alert rule '{name}'"), "/alerts"))?;

    let keyboard = Keyboard::from(vec![vec![silence_button(&found.group.name, found.rule)?]]);
    let row = AlertRow {
        source: source.to_string(),
        group: found.group.name.clone(),
        rule: found.rule.clone(),
    };
    Ok(Reply::with_keyboard(View::AlertDetail { row }, keyboard))
}

/// `/silences`
///
/// Shows the only enabled manager's first page directly, otherwise asks
/// which manager to list.
pub async fn silences<A, S, D>(ctx: &AppContext<A, S, D>) -> BotResult<Reply>
where
    S: SilenceManager + 'static,
{
    let enabled: Vec<_> = ctx.backends.enabled_silencers().collect();
    match enabled.as_slice() {
        [] => Err(BotError::disabled(SILENCES_FEATURE)),
        [(idx, _)] => silences_page(ctx, *idx, 0).await,
        managers => {
            let mut keyboard = Keyboard::new();
            for (idx, manager) in managers {
                keyboard.push_row(vec![Button::new(
                    manager.name(),
                    &Token::SilencesPage {
                        manager: *idx,
                        page: 0,
                    },
                )?]);
            }
            let view = View::ChooseManager {
                managers: managers.iter().map(|(_, m)| m.name().to_string()).collect(),
            };
            Ok(Reply::with_keyboard(view, keyboard))
        }
    }
}

/// `sl_p|<manager>|<page>`
pub async fn silences_page<A, S, D>(
    ctx: &AppContext<A, S, D>,
    manager: usize,
    page: usize,
) -> BotResult<Reply>
where
    S: SilenceManager + 'static,
{
    let silencer = ctx
        .backends
        .silencers
        .get(manager)
        .ok_or_else(|| BotError::not_found("Silence manager", "/backends"))?;
    if !silencer.enabled() {
        return Err(BotError::disabled(silencer.name()));
    }

    let page = aggregate_page(Arc::clone(silencer), page, ctx.settings.per_page).await?;

    let mut keyboard = Keyboard::new();
    for (idx, row) in page.items.iter().enumerate() {
        if let Some(id) = &row.silence.id {
            keyboard.push_row(vec![Button::new(
                format!("Unsilence #{}", page.offset() + idx + 1),
                &Token::Unsilence {
                    id: id.clone(),
                    count: row.alerts.len(),
                },
            )?]);
        }
    }
    keyboard.push_pagination(&page, |page| Token::SilencesPage { manager, page })?;

    let view = View::Silences {
        manager: silencer.name().to_string(),
        page,
    };
    Ok(Reply::with_keyboard(view, keyboard))
}

/// `/backends`
pub fn backends<A, S, D>(ctx: &AppContext<A, S, D>) -> Reply
where
    A: AlertSource,
    S: SilenceManager,
    D: DashboardSource,
{
    let backends = &ctx.backends;
    let sources = backends
        .sources
        .iter()
        .map(|source| BackendStatus {
            name: source.name().to_string(),
            enabled: source.enabled(),
            silences: backends
                .silencer_for(source.name())
                .map(|(_, manager)| manager.name().to_string()),
        })
        .collect();
    let managers = backends
        .silencers
        .iter()
        .map(|manager| BackendStatus {
            name: manager.name().to_string(),
            enabled: manager.enabled(),
            silences: None,
        })
        .collect();

    Reply::view(View::Backends {
        sources,
        managers,
        dashboards: backends.dashboards.as_ref().map(DashboardSource::enabled),
    })
}
