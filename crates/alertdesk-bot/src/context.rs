//! Application context.

use alertdesk_backends::{AlertBackend, Backends, GrafanaDashboards, SilenceBackend};

use crate::config::{BotSettings, Config, ConfigError};

/// Settings and backends, built once at startup and borrowed by every
/// handler.
#[derive(Debug)]
pub struct AppContext<A = AlertBackend, S = SilenceBackend, D = GrafanaDashboards> {
    /// Chat-side settings.
    pub settings: BotSettings,
    /// The backend table.
    pub backends: Backends<A, S, D>,
}

impl<A, S, D> AppContext<A, S, D> {
    /// Creates a context from parts.
    #[must_use]
    pub fn new(settings: BotSettings, backends: Backends<A, S, D>) -> Self {
        Self { settings, backends }
    }
}

impl AppContext {
    /// Builds the context from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let backends = Backends::from_config(&config.backends(), config.bot.request_timeout())?;
        Ok(Self::new(config.bot.clone(), backends))
    }
}
