//! Chat transport: newline-delimited JSON.
//!
//! A chat gateway writes one [`Inbound`] object per line and reads back one
//! [`Outbound`] object per line. Updates are handled concurrently; actions
//! for one update are written together.
//!
//! ```text
//! {"kind":"command","chat_id":1,"user_id":7,"username":"alice","text":"/alerts"}
//! {"action":"send","chat_id":1,"text":"Alerts (2):\n...","keyboard":[]}
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use alertdesk_backends::{AlertSource, DashboardSource, SilenceManager};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::keyboard::Keyboard;

/// Updates handled at once.
pub const MAX_IN_FLIGHT: usize = 16;

/// An update from the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inbound {
    /// A text message.
    Command {
        /// Chat the message was sent in.
        chat_id: i64,
        /// Sender.
        user_id: i64,
        /// Sender's username, if any.
        #[serde(default)]
        username: Option<String>,
        /// Message text.
        text: String,
    },
    /// A button press.
    Callback {
        /// Callback query ID, answered exactly once.
        id: String,
        /// Chat holding the message.
        chat_id: i64,
        /// Message the button belongs to.
        message_id: i64,
        /// Who pressed it.
        user_id: i64,
        /// Presser's username, if any.
        #[serde(default)]
        username: Option<String>,
        /// Button data, `prefix|payload`.
        data: String,
        /// The message's current keyboard.
        #[serde(default)]
        keyboard: Keyboard,
    },
}

/// An action for the chat gateway to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outbound {
    /// Post a new message.
    Send {
        /// Target chat.
        chat_id: i64,
        /// Message text.
        text: String,
        /// Buttons.
        keyboard: Keyboard,
    },
    /// Replace a message's text and buttons.
    Edit {
        /// Target chat.
        chat_id: i64,
        /// Target message.
        message_id: i64,
        /// New text.
        text: String,
        /// New buttons.
        keyboard: Keyboard,
    },
    /// Replace only a message's buttons.
    EditKeyboard {
        /// Target chat.
        chat_id: i64,
        /// Target message.
        message_id: i64,
        /// New buttons.
        keyboard: Keyboard,
    },
    /// Acknowledge a button press, optionally with a toast.
    Answer {
        /// Callback query ID.
        callback_id: String,
        /// Toast text.
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

/// Reads updates from `reader` until EOF and writes the resulting actions
/// to `writer`.
///
/// Lines that do not parse are logged and skipped.
///
/// # Errors
///
/// Returns an error if reading the input fails. Write failures are logged
/// per update.
pub async fn serve<A, S, D, R, W>(
    dispatcher: &Dispatcher<A, S, D>,
    reader: R,
    writer: W,
) -> std::io::Result<()>
where
    A: AlertSource,
    S: SilenceManager + 'static,
    D: DashboardSource,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let writer = Mutex::new(writer);
    let handled = AtomicUsize::new(0);
    let mut lines = reader.lines();
    let mut read_error = None;

    let updates = futures::stream::poll_fn(|cx| {
        std::pin::Pin::new(&mut lines).poll_next_line(cx).map(|line| match line {
            Ok(line) => line,
            Err(e) => {
                read_error = Some(e);
                None
            }
        })
    });

    updates
        .filter_map(|line| async move {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            match serde_json::from_str::<Inbound>(line) {
                Ok(inbound) => Some(inbound),
                Err(e) => {
                    warn!(error = %e, "skipping malformed update");
                    None
                }
            }
        })
        .for_each_concurrent(MAX_IN_FLIGHT, |inbound| {
            let writer = &writer;
            let handled = &handled;
            async move {
                let actions = dispatcher.handle(inbound).await;
                if let Err(e) = write_actions(writer, &actions).await {
                    warn!(error = %e, "failed to write actions");
                }
                handled.fetch_add(1, Ordering::Relaxed);
            }
        })
        .await;

    info!(updates = handled.load(Ordering::Relaxed), "input closed");
    read_error.map_or(Ok(()), Err)
}

async fn write_actions<W>(writer: &Mutex<W>, actions: &[Outbound]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = Vec::new();
    for action in actions {
        serde_json::to_writer(&mut out, action)?;
        out.push(b'\n');
    }
    let mut writer = writer.lock().await;
    writer.write_all(&out).await?;
    writer.flush().await?;
    debug!(actions = actions.len(), "actions written");
    Ok(())
}
