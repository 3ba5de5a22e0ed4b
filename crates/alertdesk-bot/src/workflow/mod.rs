//! Command and callback workflows.
//!
//! Each workflow is a function of the request and fresh backend state; the
//! only thing carried between steps is the token on the pressed button.

use alertdesk_backends::AlertSource;
use alertdesk_core::{Alert, AlertGroup, RuleRef, find_rule};
use futures::future::try_join_all;

use crate::context::AppContext;
use crate::error::BotResult;
use crate::keyboard::Keyboard;
use crate::view::View;

pub mod dashboards;
pub mod listing;
pub mod silence;

/// The chat user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Chat user ID.
    pub id: i64,
    /// Name recorded as silence author.
    pub name: String,
}

impl Actor {
    /// Creates an actor, naming it after the user ID when there is no
    /// username.
    #[must_use]
    pub fn new(id: i64, username: Option<&str>) -> Self {
        let name = match username {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("user:{id}"),
        };
        Self { id, name }
    }
}

/// What a workflow step produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A new message body and its buttons.
    View {
        /// Message content.
        view: View,
        /// Buttons, possibly empty.
        keyboard: Keyboard,
    },
    /// Replace only the buttons of the message the callback came from.
    Keyboard(Keyboard),
}

impl Reply {
    /// A view without buttons.
    #[must_use]
    pub fn view(view: View) -> Self {
        Self::View {
            view,
            keyboard: Keyboard::new(),
        }
    }

    /// A view with buttons.
    #[must_use]
    pub const fn with_keyboard(view: View, keyboard: Keyboard) -> Self {
        Self::View { view, keyboard }
    }
}

/// Rule groups fetched from one alert source.
#[derive(Debug, Clone)]
pub(crate) struct SourceRules {
    pub source: String,
    pub groups: Vec<AlertGroup>,
}

/// Fetches rules from every enabled source concurrently, in table order.
/// Any failing source fails the whole call.
pub(crate) async fn fetch_rules<A, S, D>(ctx: &AppContext<A, S, D>) -> BotResult<Vec<SourceRules>>
where
    A: AlertSource,
{
    let fetches = ctx.backends.enabled_sources().map(|source| async move {
        let groups = source.get_alerting_rules().await?;
        Ok::<_, alertdesk_backends::BackendError>(SourceRules {
            source: source.name().to_string(),
            groups,
        })
    });
    Ok(try_join_all(fetches).await?)
}

/// First rule, in source order, whose `group + rule` name contains `query`.
pub(crate) fn lookup_rule<'a>(
    rules: &'a [SourceRules],
    query: &str,
) -> Option<(&'a str, RuleRef<'a>)> {
    rules.iter().find_map(|source| {
        find_rule(&source.groups, query).map(|found| (source.source.as_str(), found))
    })
}

/// Silence candidate with the given fingerprint, and the source it came from.
pub(crate) fn lookup_instance<'a>(
    rules: &'a [SourceRules],
    fingerprint: &str,
) -> Option<(&'a str, Alert)> {
    rules.iter().find_map(|source| {
        source
            .groups
            .iter()
            .flat_map(|group| &group.rules)
            .flat_map(alertdesk_core::AlertRule::silence_candidates)
            .find(|alert| alert.fingerprint() == fingerprint)
            .map(|alert| (source.source.as_str(), alert))
    })
}

/// Splits off the first whitespace-separated word.
pub(crate) fn next_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}
