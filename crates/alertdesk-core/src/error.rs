//! Error types for the alertdesk-core crate.

use thiserror::Error;

/// Errors raised while building or validating alerting values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Silence failed validation before submission.
    #[error("invalid silence: {reason}")]
    InvalidSilence {
        /// The reason the silence is invalid.
        reason: String,
    },

    /// A duration string could not be parsed.
    #[error("invalid duration: {input}")]
    InvalidDuration {
        /// The rejected input.
        input: String,
    },

    /// A regex matcher value does not compile.
    #[error("invalid regex in matcher {name}: {reason}")]
    InvalidRegex {
        /// Label name of the offending matcher.
        name: String,
        /// Compiler message.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_silence() {
        let err = CoreError::InvalidSilence {
            reason: "no matchers".to_string(),
        };
        assert_eq!(err.to_string(), "invalid silence: no matchers");
    }

    #[test]
    fn error_display_invalid_duration() {
        let err = CoreError::InvalidDuration {
            input: "forever".to_string(),
        };
        assert_eq!(err.to_string(), "invalid duration: forever");
    }

    #[test]
    fn error_display_invalid_regex() {
        let err = CoreError::InvalidRegex {
            name: "job".to_string(),
            reason: "unclosed group".to_string(),
        };
        assert_eq!(err.to_string(), "invalid regex in matcher job: unclosed group");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let core_err: CoreError = json_err.unwrap_err().into();
        assert!(matches!(core_err, CoreError::SerializationError(_)));
    }
}
