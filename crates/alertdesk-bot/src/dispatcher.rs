//! Routes chat updates to workflows and turns replies into chat actions.

use alertdesk_backends::{
    AlertBackend, AlertSource, DashboardSource, GrafanaDashboards, SilenceBackend, SilenceManager,
};
use tracing::{debug, error, warn};

use crate::context::AppContext;
use crate::error::{BotError, BotResult};
use crate::keyboard::Keyboard;
use crate::render::{Renderer, TextRenderer};
use crate::token::Token;
use crate::transport::{Inbound, Outbound};
use crate::workflow::{Actor, Reply, dashboards, listing, next_word, silence};

/// Message text and buttons ready to send.
enum Rendered {
    Message { text: String, keyboard: Keyboard },
    Keyboard(Keyboard),
}

/// Handles one update at a time; safe to share between concurrent updates.
pub struct Dispatcher<A = AlertBackend, S = SilenceBackend, D = GrafanaDashboards> {
    ctx: AppContext<A, S, D>,
    renderer: Box<dyn Renderer>,
}

impl<A, S, D> std::fmt::Debug for Dispatcher<A, S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl<A, S, D> Dispatcher<A, S, D> {
    /// Creates a dispatcher rendering plain text.
    #[must_use]
    pub fn new(ctx: AppContext<A, S, D>) -> Self {
        Self {
            ctx,
            renderer: Box::new(TextRenderer),
        }
    }

    /// Replaces the renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// The application context.
    #[must_use]
    pub const fn context(&self) -> &AppContext<A, S, D> {
        &self.ctx
    }

    fn authorize(&self, actor: &Actor) -> BotResult<()> {
        if self.ctx.settings.is_allowed(actor.id) {
            Ok(())
        } else {
            Err(BotError::Unauthorized)
        }
    }

    fn render(&self, reply: Reply) -> BotResult<Rendered> {
        match reply {
            Reply::View { view, keyboard } => Ok(Rendered::Message {
                text: self.renderer.render(&view)?,
                keyboard,
            }),
            Reply::Keyboard(keyboard) => Ok(Rendered::Keyboard(keyboard)),
        }
    }
}

fn log_error(err: &BotError, update: &str) {
    match err {
        BotError::Unauthorized => warn!(update, "rejected unauthorized user"),
        e if e.is_fault() => error!(update, error = %e, source = ?e, "request failed"),
        e => debug!(update, error = %e, "request rejected"),
    }
}

impl<A, S, D> Dispatcher<A, S, D>
where
    A: AlertSource,
    S: SilenceManager + 'static,
    D: DashboardSource,
{
    /// Handles one update and returns the actions to perform, in order.
    pub async fn handle(&self, inbound: Inbound) -> Vec<Outbound> {
        match inbound {
            Inbound::Command {
                chat_id,
                user_id,
                username,
                text,
            } => {
                let actor = Actor::new(user_id, username.as_deref());
                self.on_command(chat_id, &actor, &text).await
            }
            Inbound::Callback {
                id,
                chat_id,
                message_id,
                user_id,
                username,
                data,
                keyboard,
            } => {
                let actor = Actor::new(user_id, username.as_deref());
                self.on_callback(id, chat_id, message_id, &actor, &data, &keyboard)
                    .await
            }
        }
    }

    async fn on_command(&self, chat_id: i64, actor: &Actor, text: &str) -> Vec<Outbound> {
        if !text.trim_start().starts_with('/') {
            debug!(chat_id, "ignoring plain message");
            return Vec::new();
        }
        debug!(chat_id, user = %actor.name, text, "command");

        let result = match self.run_command(actor, text).await {
            Ok(reply) => self.render(reply),
            Err(e) => Err(e),
        };
        match result {
            Ok(Rendered::Message { text, keyboard }) => {
                vec![Outbound::Send {
                    chat_id,
                    text,
                    keyboard,
                }]
            }
            Ok(Rendered::Keyboard(_)) => Vec::new(),
            Err(e) => {
                log_error(&e, "command");
                vec![Outbound::Send {
                    chat_id,
                    text: e.to_string(),
                    keyboard: Keyboard::new(),
                }]
            }
        }
    }

    async fn on_callback(
        &self,
        callback_id: String,
        chat_id: i64,
        message_id: i64,
        actor: &Actor,
        data: &str,
        keyboard: &Keyboard,
    ) -> Vec<Outbound> {
        debug!(chat_id, message_id, user = %actor.name, data, "callback");

        let result = match self.run_callback(actor, data, keyboard).await {
            Ok(reply) => self.render(reply),
            Err(e) => Err(e),
        };
        match result {
            Ok(Rendered::Message { text, keyboard }) => vec![
                Outbound::Edit {
                    chat_id,
                    message_id,
                    text,
                    keyboard,
                },
                Outbound::Answer {
                    callback_id,
                    text: None,
                },
            ],
            Ok(Rendered::Keyboard(keyboard)) => vec![
                Outbound::EditKeyboard {
                    chat_id,
                    message_id,
                    keyboard,
                },
                Outbound::Answer {
                    callback_id,
                    text: None,
                },
            ],
            Err(e) => {
                log_error(&e, "callback");
                let mut actions = vec![Outbound::Answer {
                    callback_id,
                    text: Some(e.to_string()),
                }];
                if e.clears_keyboard() {
                    actions.push(Outbound::EditKeyboard {
                        chat_id,
                        message_id,
                        keyboard: Keyboard::new(),
                    });
                }
                actions
            }
        }
    }

    async fn run_command(&self, actor: &Actor, text: &str) -> BotResult<Reply> {
        self.authorize(actor)?;
        let ctx = &self.ctx;
        let (head, args) = next_word(text);
        let command = head.trim_start_matches('/');
        // `/alerts@alertdesk_bot` in group chats.
        let command = command
            .split_once('@')
            .map_or(command, |(name, _)| name)
            .to_ascii_lowercase();

        match command.as_str() {
            "start" | "help" => Ok(listing::help()),
            "alerts" => listing::alerts(ctx, 0).await,
            "alert" => listing::alert_detail(ctx, args).await,
            "silences" => listing::silences(ctx).await,
            "silence" => silence::silence_command(ctx, actor, args).await,
            "unsilence" => silence::unsilence_command(ctx, actor, args).await,
            "dashboards" => dashboards::dashboards(ctx, 0, args).await,
            "dashboard" => dashboards::dashboard(ctx, args).await,
            "panel" => dashboards::panel(ctx, args).await,
            "backends" => Ok(listing::backends(ctx)),
            other => Err(BotError::usage(format!(
                "Unknown command /{other}. Try /help."
            ))),
        }
    }

    async fn run_callback(
        &self,
        actor: &Actor,
        data: &str,
        keyboard: &Keyboard,
    ) -> BotResult<Reply> {
        self.authorize(actor)?;
        let ctx = &self.ctx;
        let token = Token::parse(data)?;

        match &token {
            Token::AlertsPage { page } => listing::alerts(ctx, *page).await,
            Token::SilencesPage { manager, page } => {
                listing::silences_page(ctx, *manager, *page).await
            }
            Token::DashboardsPage { page, query } => {
                dashboards::dashboards(ctx, *page, query).await
            }
            Token::ChooseAlert { query } => silence::choose_alert(ctx, query).await,
            Token::ConfirmSilence {
                duration,
                fingerprint,
            } => silence::confirm_silence(ctx, actor, *duration, fingerprint).await,
            Token::Unsilence { id, .. } => silence::unsilence(ctx, actor, id).await,
            Token::Clear { .. } => Ok(silence::clear(keyboard, &token)),
        }
    }
}
