//! Bot error types.

use alertdesk_backends::BackendError;
use alertdesk_core::CoreError;
use thiserror::Error;

/// A workflow token that could not be decoded or encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The callback data has no `prefix|payload` shape.
    #[error("malformed callback data: {0:?}")]
    Malformed(String),

    /// The prefix names no known stage.
    #[error("unknown token prefix: {0:?}")]
    UnknownPrefix(String),

    /// A payload field failed to parse.
    #[error("invalid {field} in token: {value:?}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// The encoded token exceeds the callback data limit.
    #[error("token is {len} bytes, limit is {max}")]
    TooLong {
        /// Encoded length.
        len: usize,
        /// Limit.
        max: usize,
    },
}

/// A view could not be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("render failed: {0}")]
pub struct RenderError(pub String);

impl From<std::fmt::Error> for RenderError {
    fn from(e: std::fmt::Error) -> Self {
        Self(e.to_string())
    }
}

/// Errors surfaced to chat users.
#[derive(Debug, Error)]
pub enum BotError {
    /// Bad command input; shown verbatim.
    #[error("{0}")]
    Usage(String),

    /// A looked-up entity does not exist.
    #[error("{what} not found. Try {hint}.")]
    NotFound {
        /// What was looked up.
        what: String,
        /// Listing command that shows valid choices.
        hint: &'static str,
    },

    /// A backend call failed.
    #[error("{0}")]
    Backend(BackendError),

    /// Some rows of an aggregated page failed.
    #[error("Failed to load matching alerts for {failed} of {total} silences.")]
    Aggregate {
        /// Failed rows.
        failed: usize,
        /// Rows on the page.
        total: usize,
    },

    /// The backend needed for the request is switched off.
    #[error("{backend} is disabled.")]
    Disabled {
        /// Backend or feature name.
        backend: String,
    },

    /// A stale or malformed callback.
    #[error("This button is no longer valid. Run the command again.")]
    Token(#[from] TokenError),

    /// The user is not on the allow-list.
    #[error("You are not allowed to use this bot.")]
    Unauthorized,

    /// A view could not be rendered.
    #[error("render failed")]
    Render(#[from] RenderError),
}

impl BotError {
    /// Shorthand for [`BotError::Usage`].
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Shorthand for [`BotError::NotFound`].
    pub fn not_found(what: impl Into<String>, hint: &'static str) -> Self {
        Self::NotFound {
            what: what.into(),
            hint,
        }
    }

    /// Shorthand for [`BotError::Disabled`].
    pub fn disabled(backend: impl Into<String>) -> Self {
        Self::Disabled {
            backend: backend.into(),
        }
    }

    /// Whether a callback that failed with this error should lose its
    /// keyboard, since pressing the buttons again cannot succeed.
    #[must_use]
    pub const fn clears_keyboard(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Disabled { .. } | Self::Token(_)
        )
    }

    /// Whether this error indicates a fault rather than bad input.
    ///
    /// Backend errors raised before any request was sent, such as an
    /// unusable silence ID, count as bad input.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        match self {
            Self::Backend(e) => !e.is_local(),
            Self::Aggregate { .. } | Self::Render(_) => true,
            _ => false,
        }
    }
}

impl From<BackendError> for BotError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Disabled { backend } => Self::Disabled { backend },
            BackendError::Core(core) => core.into(),
            other => Self::Backend(other),
        }
    }
}

impl From<CoreError> for BotError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::SerializationError(_) => Self::Backend(BackendError::Core(e)),
            other => Self::Usage(other.to_string()),
        }
    }
}

/// Result type for bot operations.
pub type BotResult<T> = std::result::Result<T, BotError>;
