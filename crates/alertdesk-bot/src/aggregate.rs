//! Silence page aggregation.
//!
//! A silences page shows each active silence together with the alerts it
//! currently matches. The matching alerts are fetched concurrently, one task
//! per row, and written back into a slot per row so the page keeps the
//! backend's silence order.

use std::sync::Arc;

use alertdesk_backends::SilenceManager;
use alertdesk_core::{MatchingAlert, Page, Silence, paginate};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{BotError, BotResult};

/// An active silence with the alerts it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SilenceWithAlerts {
    /// The silence.
    pub silence: Silence,
    /// Alerts currently selected by its matchers.
    pub alerts: Vec<MatchingAlert>,
}

/// Per-row results shared by the row tasks.
struct Slots {
    rows: Vec<Option<SilenceWithAlerts>>,
    errors: Vec<String>,
}

impl Slots {
    fn new(len: usize) -> Self {
        Self {
            rows: (0..len).map(|_| None).collect(),
            errors: Vec::new(),
        }
    }
}

fn fill(slots: &Mutex<Slots>, idx: usize, row: SilenceWithAlerts) {
    slots.lock().rows[idx] = Some(row);
}

fn fail(slots: &Mutex<Slots>, cause: String) {
    slots.lock().errors.push(cause);
}

/// Builds one page of active silences with their matching alerts.
///
/// # Errors
///
/// Returns the backend error if the silence list cannot be fetched, and
/// `BotError::Aggregate` if any row's matching alerts cannot be fetched.
/// Individual row failures are logged.
pub async fn aggregate_page<S>(
    manager: Arc<S>,
    page: usize,
    per_page: usize,
) -> BotResult<Page<SilenceWithAlerts>>
where
    S: SilenceManager + 'static,
{
    let active: Vec<Silence> = manager
        .get_silences()
        .await?
        .into_iter()
        .filter(Silence::is_active)
        .collect();
    let page = paginate(&active, page, per_page);
    let total = page.items.len();

    let slots = Arc::new(Mutex::new(Slots::new(total)));
    let handles: Vec<_> = page
        .items
        .iter()
        .cloned()
        .enumerate()
        .map(|(idx, silence)| {
            let manager = Arc::clone(&manager);
            let slots = Arc::clone(&slots);
            tokio::spawn(async move {
                let result = manager.get_silence_matching_alerts(&silence).await;
                match result {
                    Ok(alerts) => fill(&slots, idx, SilenceWithAlerts { silence, alerts }),
                    Err(e) => fail(
                        &slots,
                        format!("{}: {e}", silence.id.as_deref().unwrap_or("-")),
                    ),
                }
            })
        })
        .collect();

    for joined in join_all(handles).await {
        if let Err(e) = joined {
            fail(&slots, format!("row task failed: {e}"));
        }
    }

    let (rows, errors) = {
        let mut guard = slots.lock();
        (
            std::mem::take(&mut guard.rows),
            std::mem::take(&mut guard.errors),
        )
    };

    if !errors.is_empty() {
        for cause in &errors {
            error!(manager = %manager.name(), cause = %cause, "failed to fetch alerts for silence");
        }
        return Err(BotError::Aggregate {
            failed: errors.len(),
            total,
        });
    }

    debug!(
        manager = %manager.name(),
        page = page.page,
        rows = total,
        "aggregated silence page"
    );
    let rows = rows.into_iter().flatten().collect();
    Ok(page.map_items(rows))
}
