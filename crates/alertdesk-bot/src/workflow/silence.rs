//! Creating and deleting silences.
//!
//! From an alert: `sil_a` shows the rule's instances with one duration
//! button each, `sil_d` creates the silence for the chosen instance, and the
//! reply carries `unsil`/`clr` buttons when the silence mutes something.

use std::sync::Arc;
use std::time::Duration;

use alertdesk_backends::{AlertSource, SilenceManager};
use alertdesk_core::{
    Alert, Matcher, Silence, format_duration, matchers_from_labels, parse_duration,
    parse_matchers, same_matchers,
};
use chrono::Utc;
use futures::future::try_join_all;
use tracing::info;

use super::listing::SILENCES_FEATURE;
use super::{Actor, Reply, fetch_rules, lookup_instance, lookup_rule, next_word};
use crate::context::AppContext;
use crate::error::{BotError, BotResult};
use crate::keyboard::{Button, Keyboard};
use crate::token::Token;
use crate::view::View;

/// Most instances offered for one rule.
pub const MAX_CANDIDATES: usize = 8;

const SILENCE_USAGE: &str = "Usage: /silence [@manager] <duration> <matchers>";
const UNSILENCE_USAGE: &str = "Usage: /unsilence <id|matchers>";

/// `sil_a|<query>`
pub async fn choose_alert<A, S, D>(ctx: &AppContext<A, S, D>, query: &str) -> BotResult<Reply>
where
    A: AlertSource,
    S: SilenceManager,
{
    let rules = fetch_rules(ctx).await?;
    let (source, found) =
        lookup_rule(&rules, query).ok_or_else(|| BotError::not_found("Alert rule", "/alerts"))?;
    let (_, manager) = ctx
        .backends
        .silencer_for(source)
        .ok_or_else(|| BotError::disabled(SILENCES_FEATURE))?;

    let durations = manager.mute_durations();
    let candidates: Vec<Alert> = found
        .rule
        .silence_candidates()
        .into_iter()
        .take(MAX_CANDIDATES)
        .collect();

    let mut keyboard = Keyboard::new();
    for (idx, alert) in candidates.iter().enumerate() {
        let fingerprint = alert.fingerprint();
        let row = durations
            .iter()
            .map(|duration| {
                let label = if candidates.len() > 1 {
                    format!("#{} {}", idx + 1, format_duration(*duration))
                } else {
                    format_duration(*duration)
                };
                Button::new(
                    label,
                    &Token::ConfirmSilence {
                        duration: *duration,
                        fingerprint: fingerprint.clone(),
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        keyboard.push_row(row);
    }

    let view = View::ChooseAlert {
        rule: found.rule.name.clone(),
        manager: manager.name().to_string(),
        candidates,
    };
    Ok(Reply::with_keyboard(view, keyboard))
}

/// `sil_d|<duration>|<fingerprint>`
pub async fn confirm_silence<A, S, D>(
    ctx: &AppContext<A, S, D>,
    actor: &Actor,
    duration: Duration,
    fingerprint: &str,
) -> BotResult<Reply>
where
    A: AlertSource,
    S: SilenceManager,
{
    let rules = fetch_rules(ctx).await?;
    let (source, alert) = lookup_instance(&rules, fingerprint)
        .ok_or_else(|| BotError::not_found("Alert", "/alerts"))?;
    let (_, manager) = ctx
        .backends
        .silencer_for(source)
        .ok_or_else(|| BotError::disabled(SILENCES_FEATURE))?;

    create_and_report(
        ctx,
        manager,
        actor,
        matchers_from_labels(&alert.labels),
        duration,
    )
    .await
}

/// `/silence [@manager] <duration> <matchers...>`
pub async fn silence_command<A, S, D>(
    ctx: &AppContext<A, S, D>,
    actor: &Actor,
    args: &str,
) -> BotResult<Reply>
where
    S: SilenceManager,
{
    let (mut word, mut rest) = next_word(args);
    let target = match word.strip_prefix('@') {
        Some(name) => {
            (word, rest) = next_word(rest);
            Some(name)
        }
        None => None,
    };
    if word.is_empty() {
        return Err(BotError::usage(SILENCE_USAGE));
    }

    let duration = parse_duration(word)
        .map_err(|_| BotError::usage(format!("Invalid duration '{word}'. {SILENCE_USAGE}")))?;
    let matchers = parse_matchers(rest);
    if matchers.is_empty() {
        return Err(BotError::usage(SILENCE_USAGE));
    }

    let manager = match target {
        Some(name) => {
            let (_, manager) = ctx.backends.silencer_by_name(name).ok_or_else(|| {
                BotError::not_found(format!("Silence manager '{name}'"), "/backends")
            })?;
            if !manager.enabled() {
                return Err(BotError::disabled(manager.name()));
            }
            manager
        }
        None => ctx
            .backends
            .enabled_silencers()
            .next()
            .map(|(_, manager)| manager)
            .ok_or_else(|| BotError::disabled(SILENCES_FEATURE))?,
    };

    create_and_report(ctx, manager, actor, matchers, duration).await
}

async fn create_and_report<A, S, D>(
    ctx: &AppContext<A, S, D>,
    manager: &Arc<S>,
    actor: &Actor,
    matchers: Vec<Matcher>,
    duration: Duration,
) -> BotResult<Reply>
where
    S: SilenceManager,
{
    let silence = Silence::new(
        matchers,
        Utc::now(),
        duration,
        actor.name.clone(),
        ctx.settings.comment.clone(),
    )?;
    let id = manager.create_silence(&silence).await?;
    let created = manager.get_silence(&id).await?;
    let alerts = manager.get_silence_matching_alerts(&created).await?;
    info!(
        manager = %manager.name(),
        silence_id = %id,
        user = %actor.name,
        duration = %format_duration(duration),
        alerts = alerts.len(),
        "silence created from chat"
    );

    let mut keyboard = Keyboard::new();
    if !alerts.is_empty() {
        let count = alerts.len();
        keyboard.push_row(vec![
            Button::new(
                "Unsilence",
                &Token::Unsilence {
                    id: id.clone(),
                    count,
                },
            )?,
            Button::new("Clear", &Token::Clear { id, count })?,
        ]);
    }

    let view = View::SilenceCreated {
        manager: manager.name().to_string(),
        silence: created,
        alerts,
    };
    Ok(Reply::with_keyboard(view, keyboard))
}

/// `unsil|<id>|<count>`
pub async fn unsilence<A, S, D>(
    ctx: &AppContext<A, S, D>,
    actor: &Actor,
    id: &str,
) -> BotResult<Reply>
where
    S: SilenceManager,
{
    expire(ctx, actor, id, None).await
}

/// `/unsilence <id|matchers>`
pub async fn unsilence_command<A, S, D>(
    ctx: &AppContext<A, S, D>,
    actor: &Actor,
    args: &str,
) -> BotResult<Reply>
where
    S: SilenceManager,
{
    let query = args.trim();
    if query.is_empty() {
        return Err(BotError::usage(UNSILENCE_USAGE));
    }
    let matchers = parse_matchers(query);
    expire(ctx, actor, query, Some(&matchers)).await
}

/// `clr|<id>|<count>`: drops the row holding the pressed button.
pub fn clear(keyboard: &Keyboard, token: &Token) -> Reply {
    Reply::Keyboard(keyboard.without_payload(&token.payload()))
}

/// Every silence of every enabled manager, tagged with the manager index.
async fn all_silences<A, S, D>(ctx: &AppContext<A, S, D>) -> BotResult<Vec<(usize, Silence)>>
where
    S: SilenceManager,
{
    let fetches = ctx
        .backends
        .enabled_silencers()
        .map(|(idx, manager)| async move {
            let silences = manager.get_silences().await?;
            Ok::<_, alertdesk_backends::BackendError>(
                silences.into_iter().map(|s| (idx, s)).collect::<Vec<_>>(),
            )
        });
    Ok(try_join_all(fetches).await?.into_iter().flatten().collect())
}

/// First silence with the same matcher set, preferring one not yet expired.
fn by_matchers<'a>(
    silences: &'a [(usize, Silence)],
    wanted: &[Matcher],
) -> Option<&'a (usize, Silence)> {
    let mut same = silences
        .iter()
        .filter(|(_, s)| same_matchers(&s.matchers, wanted))
        .peekable();
    let first = same.peek().copied();
    same.find(|(_, s)| !s.is_expired()).or(first)
}

async fn expire<A, S, D>(
    ctx: &AppContext<A, S, D>,
    actor: &Actor,
    query: &str,
    matchers: Option<&[Matcher]>,
) -> BotResult<Reply>
where
    S: SilenceManager,
{
    let silences = all_silences(ctx).await?;
    let not_found = || BotError::not_found(format!("Silence '{query}'"), "/silences");

    let (idx, silence) = silences
        .iter()
        .find(|(_, s)| s.id.as_deref() == Some(query))
        .or_else(|| matchers.and_then(|wanted| by_matchers(&silences, wanted)))
        .ok_or_else(not_found)?;
    let manager = ctx.backends.silencers.get(*idx).ok_or_else(not_found)?;
    let id = silence.id.clone().ok_or_else(not_found)?;

    if silence.is_expired() {
        info!(manager = %manager.name(), silence_id = %id, "silence already expired");
        return Ok(Reply::view(View::AlreadyDeleted {
            manager: manager.name().to_string(),
            id,
        }));
    }

    manager.delete_silence(&id).await?;
    info!(
        manager = %manager.name(),
        silence_id = %id,
        user = %actor.name,
        "silence deleted from chat"
    );
    Ok(Reply::view(View::Unsilenced {
        manager: manager.name().to_string(),
        silence: silence.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeContext, FakeManager, FakeSource, context, group, rule, silence, view_and_keyboard,
    };
    use alertdesk_core::{AlertRule, RuleState};
    use std::collections::BTreeMap;

    fn actor() -> Actor {
        Actor::new(42, Some("alice"))
    }

    fn host_test_rule() -> AlertRule {
        let mut r = rule("HostDown", &[]);
        r.alerts = vec![Alert::new(
            BTreeMap::from([("host".to_string(), "test".to_string())]),
            RuleState::Firing,
        )];
        r
    }

    fn ctx_with(rules: Vec<AlertRule>, managers: Vec<FakeManager>) -> FakeContext {
        context(
            vec![FakeSource::new("Grafana", vec![group("node", rules)])],
            managers,
            None,
        )
    }

    #[tokio::test]
    async fn choose_alert_offers_durations_per_instance() {
        let ctx = ctx_with(
            vec![rule("HostDown", &[&[("host", "a")], &[("host", "b")]])],
            vec![FakeManager::new("prod")],
        );

        let (view, keyboard) = view_and_keyboard(choose_alert(&ctx, "nodehostdown").await.unwrap());
        let View::ChooseAlert { manager, candidates, .. } = view else {
            panic!("expected choose view");
        };
        assert_eq!(manager, "prod");
        assert_eq!(candidates.len(), 2);
        assert_eq!(keyboard.rows().len(), 2);
        assert_eq!(keyboard.rows()[1][0].label, "#2 1h");
        assert_eq!(
            keyboard.rows()[1][1].data(),
            format!("sil_d|4h|{}", candidates[1].fingerprint())
        );
    }

    #[tokio::test]
    async fn choose_alert_without_instances_uses_rule_labels() {
        let ctx = ctx_with(vec![rule("Watchdog", &[])], vec![FakeManager::new("prod")]);
        let (view, keyboard) = view_and_keyboard(choose_alert(&ctx, "watchdog").await.unwrap());
        let View::ChooseAlert { candidates, .. } = view else {
            panic!("expected choose view");
        };
        assert_eq!(candidates[0].labels["alertname"], "Watchdog");
        assert_eq!(keyboard.rows()[0][0].label, "1h");
    }

    #[tokio::test]
    async fn choose_alert_miss_is_not_found() {
        let ctx = ctx_with(vec![rule("HostDown", &[])], vec![FakeManager::new("prod")]);
        let err = choose_alert(&ctx, "diskfull").await.unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));
        assert!(err.clears_keyboard());
    }

    #[tokio::test]
    async fn duration_button_creates_silence_from_instance_labels() {
        let ctx = ctx_with(vec![host_test_rule()], vec![FakeManager::new("prod")]);
        let fingerprint = host_test_rule().alerts[0].fingerprint();
        let token = Token::parse(&format!("sil_d|1h|{fingerprint}")).unwrap();
        let Token::ConfirmSilence { duration, fingerprint } = token else {
            panic!("expected confirm token");
        };

        let reply = confirm_silence(&ctx, &actor(), duration, &fingerprint)
            .await
            .unwrap();

        let created = ctx.backends.silencers[0].created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].matchers, vec![Matcher::equal("host", "test")]);
        assert_eq!(created[0].duration(), Duration::from_secs(3600));
        assert_eq!(created[0].created_by, "alice");
        assert_eq!(created[0].comment, "Silenced from chat");

        let (view, keyboard) = view_and_keyboard(reply);
        assert!(matches!(view, View::SilenceCreated { ref alerts, .. } if alerts.len() == 1));
        let labels: Vec<_> = keyboard.rows()[0].iter().map(|b| b.prefix.as_str()).collect();
        assert_eq!(labels, vec!["unsil", "clr"]);
        assert_eq!(keyboard.rows()[0][0].payload, keyboard.rows()[0][1].payload);
    }

    #[tokio::test]
    async fn stale_fingerprint_is_not_found() {
        let ctx = ctx_with(vec![host_test_rule()], vec![FakeManager::new("prod")]);
        let err = confirm_silence(&ctx, &actor(), Duration::from_secs(3600), "ffffffffffffffff")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));
        assert!(ctx.backends.silencers[0].created().is_empty());
    }

    #[tokio::test]
    async fn silence_command_creates_two_hour_silence() {
        let ctx = ctx_with(vec![], vec![FakeManager::new("prod")]);
        silence_command(&ctx, &actor(), "2h host=test").await.unwrap();

        let created = ctx.backends.silencers[0].created();
        assert_eq!(created[0].duration(), Duration::from_secs(7200));
        assert_eq!(created[0].matchers, vec![Matcher::equal("host", "test")]);
    }

    #[tokio::test]
    async fn silence_command_targets_named_manager() {
        let ctx = ctx_with(
            vec![],
            vec![FakeManager::new("Grafana"), FakeManager::new("prod")],
        );
        silence_command(&ctx, &actor(), "@PROD 30m job=~api.* HighLatency")
            .await
            .unwrap();

        assert!(ctx.backends.silencers[0].created().is_empty());
        let created = ctx.backends.silencers[1].created();
        assert_eq!(created[0].matchers.len(), 2);
        assert_eq!(created[0].matchers[1], Matcher::equal("alertname", "HighLatency"));
    }

    #[tokio::test]
    async fn silence_command_usage_errors() {
        let ctx = ctx_with(vec![], vec![FakeManager::new("prod")]);
        for args in ["", "2h", "soon host=a", "@prod", "20000000w host=a"] {
            let err = silence_command(&ctx, &actor(), args).await.unwrap_err();
            assert!(matches!(err, BotError::Usage(_)), "{args}: {err}");
        }
        let err = silence_command(&ctx, &actor(), "@staging 1h host=a").await.unwrap_err();
        assert!(matches!(err, BotError::NotFound { .. }));
        assert!(ctx.backends.silencers[0].created().is_empty());
    }

    #[tokio::test]
    async fn silence_command_rejects_bad_regex() {
        let ctx = ctx_with(vec![], vec![FakeManager::new("prod")]);
        let err = silence_command(&ctx, &actor(), "1h job=~(unclosed")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Usage(_)));
        assert!(ctx.backends.silencers[0].created().is_empty());
    }

    #[tokio::test]
    async fn silence_command_on_disabled_manager() {
        let ctx = ctx_with(vec![], vec![FakeManager::new("prod").disabled()]);
        let err = silence_command(&ctx, &actor(), "1h host=a").await.unwrap_err();
        assert_eq!(err.to_string(), "Silence management is disabled.");
        let err = silence_command(&ctx, &actor(), "@prod 1h host=a").await.unwrap_err();
        assert_eq!(err.to_string(), "prod is disabled.");
    }

    #[tokio::test]
    async fn unsilence_expired_reports_already_deleted_without_delete() {
        let ctx = ctx_with(
            vec![],
            vec![FakeManager::new("prod").with_silences(vec![silence("s1", "expired", "host=a")])],
        );
        let reply = unsilence(&ctx, &actor(), "s1").await.unwrap();
        assert_eq!(
            reply,
            Reply::view(View::AlreadyDeleted {
                manager: "prod".to_string(),
                id: "s1".to_string(),
            })
        );
        assert!(ctx.backends.silencers[0].deleted().is_empty());
    }

    #[tokio::test]
    async fn unsilence_searches_every_manager() {
        let ctx = ctx_with(
            vec![],
            vec![
                FakeManager::new("Grafana").with_silences(vec![silence("g1", "active", "host=a")]),
                FakeManager::new("prod").with_silences(vec![silence("p1", "active", "host=b")]),
            ],
        );
        unsilence(&ctx, &actor(), "p1").await.unwrap();
        assert!(ctx.backends.silencers[0].deleted().is_empty());
        assert_eq!(ctx.backends.silencers[1].deleted(), vec!["p1"]);
    }

    #[tokio::test]
    async fn unsilence_command_matches_by_matcher_set() {
        let ctx = ctx_with(
            vec![],
            vec![FakeManager::new("prod").with_silences(vec![
                silence("old", "expired", "host=a job=api"),
                silence("new", "active", "job=api host=a"),
            ])],
        );
        unsilence_command(&ctx, &actor(), "host=a job=api").await.unwrap();
        assert_eq!(ctx.backends.silencers[0].deleted(), vec!["new"]);
    }

    #[tokio::test]
    async fn unsilence_unknown_is_not_found() {
        let ctx = ctx_with(vec![], vec![FakeManager::new("prod")]);
        let err = unsilence(&ctx, &actor(), "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Silence 'nope' not found. Try /silences.");
        assert!(matches!(
            unsilence_command(&ctx, &actor(), "  ").await,
            Err(BotError::Usage(_))
        ));
    }

    #[test]
    fn clear_drops_only_the_pressed_row() {
        let keyboard = Keyboard::from(vec![
            vec![
                Button::new("Unsilence", &Token::Unsilence { id: "a".into(), count: 1 }).unwrap(),
                Button::new("Clear", &Token::Clear { id: "a".into(), count: 1 }).unwrap(),
            ],
            vec![Button::new("Next »", &Token::AlertsPage { page: 1 }).unwrap()],
        ]);
        let reply = clear(&keyboard, &Token::Clear { id: "a".into(), count: 1 });
        let Reply::Keyboard(remaining) = reply else {
            panic!("expected keyboard reply");
        };
        assert_eq!(remaining.rows().len(), 1);
        assert_eq!(remaining.rows()[0][0].data(), "al_p|1");
    }
}
