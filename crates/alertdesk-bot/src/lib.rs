//! Chat front end for alerting backends.
//!
//! `alertdesk-bot` turns chat commands and button presses into calls on the
//! backend table from `alertdesk-backends` and back into chat actions.
//!
//! - [`workflow`]: one function per command or button stage
//! - [`token`] and [`keyboard`]: the `prefix|payload` button protocol; every
//!   stage re-reads backend state, nothing is kept between presses
//! - [`aggregate`]: concurrent silence pages with their matching alerts
//! - [`dispatcher`]: authorization, routing and error reporting
//! - [`transport`]: the newline-delimited JSON chat gateway protocol
//!
//! ```rust,no_run
//! use alertdesk_bot::{AppContext, Config, Dispatcher, transport};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_file("alertdesk.toml")?;
//! let dispatcher = Dispatcher::new(AppContext::from_config(&config)?);
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! transport::serve(&dispatcher, stdin, tokio::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod aggregate;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod keyboard;
pub mod render;
pub mod token;
pub mod transport;
pub mod view;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use aggregate::{SilenceWithAlerts, aggregate_page};
pub use config::{BotSettings, Config, ConfigError};
pub use context::AppContext;
pub use dispatcher::Dispatcher;
pub use error::{BotError, BotResult, RenderError, TokenError};
pub use keyboard::{Button, Keyboard};
pub use render::{Renderer, TextRenderer};
pub use token::{MAX_TOKEN_LEN, Token};
pub use transport::{Inbound, Outbound, serve};
pub use view::View;
pub use workflow::{Actor, Reply};
