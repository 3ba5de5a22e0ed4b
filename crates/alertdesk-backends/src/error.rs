//! Error types for the backend adapters.

use alertdesk_core::CoreError;
use thiserror::Error;

/// Errors returned by backend adapters.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not be sent or the connection failed.
    #[error("{backend}: request failed: {message}")]
    Transport {
        /// Backend name.
        backend: String,
        /// Underlying transport message.
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("{backend}: unexpected status {status}: {body}")]
    Status {
        /// Backend name.
        backend: String,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("{backend}: invalid response: {message}")]
    Decode {
        /// Backend name.
        backend: String,
        /// Decoder message.
        message: String,
    },

    /// The backend is switched off in configuration.
    #[error("{backend} is disabled.")]
    Disabled {
        /// Backend name.
        backend: String,
    },

    /// A silence ID that cannot be used in a request path.
    #[error("{backend}: invalid silence id {id:?}")]
    InvalidId {
        /// Backend name.
        backend: String,
        /// The rejected ID.
        id: String,
    },

    /// Invalid backend configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Domain validation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BackendError {
    /// Returns true if this error was raised without contacting the backend.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Disabled { .. } | Self::InvalidId { .. } | Self::Config(_) | Self::Core(_)
        )
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_status() {
        let err = BackendError::Status {
            backend: "alertmanager".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "alertmanager: unexpected status 503: unavailable");
        assert!(!err.is_local());
    }

    #[test]
    fn error_display_disabled() {
        let err = BackendError::Disabled {
            backend: "Grafana".to_string(),
        };
        assert_eq!(err.to_string(), "Grafana is disabled.");
        assert!(err.is_local());
    }

    #[test]
    fn error_from_core() {
        let err: BackendError = CoreError::InvalidSilence {
            reason: "no matchers".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "invalid silence: no matchers");
    }
}
