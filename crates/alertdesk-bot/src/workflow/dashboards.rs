//! Dashboard and panel search.

use alertdesk_backends::{Dashboard, DashboardSource, Panel};
use alertdesk_core::{filter_by_name, find_by_name, paginate};
use tracing::debug;

use super::Reply;
use crate::context::AppContext;
use crate::error::{BotError, BotResult};
use crate::keyboard::Keyboard;
use crate::token::Token;
use crate::view::{DashboardLink, PanelLink, View};

const DASHBOARDS_FEATURE: &str = "Dashboards";

fn source<A, S, D>(ctx: &AppContext<A, S, D>) -> BotResult<&D>
where
    D: DashboardSource,
{
    ctx.backends
        .dashboards
        .as_ref()
        .filter(|d| d.enabled())
        .ok_or_else(|| BotError::disabled(DASHBOARDS_FEATURE))
}

fn dashboard_link<D: DashboardSource>(source: &D, dashboard: &Dashboard) -> DashboardLink {
    DashboardLink {
        title: dashboard.title.clone(),
        folder: dashboard.folder.clone(),
        link: source.dashboard_link(dashboard),
    }
}

fn panel_link<D: DashboardSource>(source: &D, panel: &Panel) -> PanelLink {
    PanelLink {
        title: panel.title.clone(),
        link: source.panel_link(panel),
    }
}

/// `/dashboards [query]`, `db_p|<page>|<query>`
pub async fn dashboards<A, S, D>(
    ctx: &AppContext<A, S, D>,
    page: usize,
    query: &str,
) -> BotResult<Reply>
where
    D: DashboardSource,
{
    let source = source(ctx)?;
    let all = source.list_dashboards().await?;
    let links: Vec<DashboardLink> = filter_by_name(&all, query)
        .into_iter()
        .map(|d| dashboard_link(source, d))
        .collect();

    let page = paginate(&links, page, ctx.settings.per_page);
    let mut keyboard = Keyboard::new();
    keyboard.push_pagination(&page, |page| Token::dashboards_page(page, query))?;

    let view = View::Dashboards {
        query: query.trim().to_string(),
        page,
    };
    Ok(Reply::with_keyboard(view, keyboard))
}

/// `/dashboard <name>`
pub async fn dashboard<A, S, D>(ctx: &AppContext<A, S, D>, name: &str) -> BotResult<Reply>
where
    D: DashboardSource,
{
    if name.trim().is_empty() {
        return Err(BotError::usage("Usage: /dashboard <name>"));
    }
    let source = source(ctx)?;
    let all = source.list_dashboards().await?;
    let found = find_by_name(&all, name)
        .ok_or_else(|| BotError::not_found(format!("Dashboard '{name}'"), "/dashboards"))?;

    let panels = source
        .list_panels(&found.uid)
        .await?
        .iter()
        .map(|p| panel_link(source, p))
        .collect();

    Ok(Reply::view(View::Dashboard {
        dashboard: dashboard_link(source, found),
        panels,
    }))
}

/// `/panel <name>`
///
/// Matches against dashboard title plus panel title. Dashboards are scanned
/// one at a time in listing order and the scan stops at the first hit.
pub async fn panel<A, S, D>(ctx: &AppContext<A, S, D>, name: &str) -> BotResult<Reply>
where
    D: DashboardSource,
{
    if name.trim().is_empty() {
        return Err(BotError::usage("Usage: /panel <name>"));
    }
    let source = source(ctx)?;
    for dashboard in source.list_dashboards().await? {
        let panels = source.list_panels(&dashboard.uid).await?;
        if let Some(found) = find_by_name(&panels, name) {
            debug!(dashboard = %dashboard.uid, panel = found.id, "panel found");
            return Ok(Reply::view(View::Panel {
                dashboard: dashboard.title.clone(),
                panel: panel_link(source, found),
                render_link: source.panel_render_link(found),
            }));
        }
    }
    Err(BotError::not_found(format!("Panel '{name}'"), "/dashboards"))
}
