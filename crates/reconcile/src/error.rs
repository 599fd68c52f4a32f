//! Error types for reconciliation.
//!
//! Skips are not errors: they are decisions reported through the
//! notification sink. Only classification failures, malformed payloads and
//! collaborator failures surface here.

use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling a single payload.
#[derive(Debug, Error)]
pub enum Error {
    /// No classification rule matched the payload's discriminator
    #[error("Unsupported configuration type {discriminator}")]
    UnsupportedType {
        /// The discriminator that failed to classify
        discriminator: String,
    },

    /// The payload carries neither `@odata.type` nor `@odata.context`
    #[error("payload has no type discriminator (@odata.type or @odata.context)")]
    MissingDiscriminator,

    /// The payload is valid JSON but not a configuration object
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The payload could not be parsed or re-serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A remote fetch, create or patch failed; propagated as-is
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl Error {
    /// Whether this error came from classifying the payload.
    ///
    /// Classification failures are fatal for the payload but never for the
    /// run.
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::UnsupportedType { .. } | Self::MissingDiscriminator)
    }

    /// Whether this error came from the remote collaborator.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_display() {
        let err = Error::UnsupportedType {
            discriminator: "#microsoft.graph.somethingNew".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported configuration type #microsoft.graph.somethingNew"
        );
        assert!(err.is_classification());
        assert!(!err.is_remote());
    }

    #[test]
    fn test_remote_is_transparent() {
        let err: Error = anyhow::anyhow!("HTTP 503").into();
        assert_eq!(err.to_string(), "HTTP 503");
        assert!(err.is_remote());
        assert!(!err.is_classification());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
