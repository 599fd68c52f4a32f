//! Error types for Graph API operations.
//!
//! Errors are categorized to drive retry decisions and user feedback.

use crate::types::ODataError;
use std::fmt;
use std::time::Duration;

/// Result type alias for Graph API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Graph API errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport failure or gateway error (transient, retryable).
    Network,
    /// Request rate limit hit (retryable, honoring `Retry-After`).
    Throttled,
    /// Missing, expired or insufficient credentials.
    Auth,
    /// Resource does not exist.
    NotFound,
    /// The API refused the request body.
    Rejected,
    /// The request conflicts with the current state of the resource.
    Conflict,
    /// The response could not be understood.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Throttled)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Throttled => "Request throttled",
            Self::Auth => "Authentication failed",
            Self::NotFound => "Resource not found",
            Self::Rejected => "Request rejected",
            Self::Conflict => "Conflicting change",
            Self::Format => "Unexpected response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::Throttled => "Wait a few minutes or lower --jobs and try again",
            Self::Auth => "Refresh the access token and check its permissions",
            Self::NotFound => "Verify the object still exists in the tenant",
            Self::Rejected => "The exported document may not be valid for this tenant",
            Self::Conflict => "Another change was made concurrently, try again",
            Self::Format => "Check the API version in the configuration",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during Graph API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered with a non-success status.
    #[error("Graph API error {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Graph error code, empty when the body had none.
        code: String,
        /// Error message.
        message: String,
        /// Delay requested by the server.
        retry_after: Option<Duration>,
    },

    /// Request could not be sent or the response could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// No access token was supplied.
    #[error("missing access token: {0}")]
    MissingToken(String),
}

impl Error {
    /// Build an API error from a failed response.
    ///
    /// The Graph error envelope is used when present; otherwise the raw body
    /// becomes the message.
    pub fn from_response(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let (code, message) = match serde_json::from_str::<ODataError>(body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) if body.trim().is_empty() => (String::new(), format!("HTTP {}", status)),
            Err(_) => (String::new(), body.trim().to_string()),
        };

        Self::Api {
            status,
            code,
            message,
            retry_after,
        }
    }

    /// HTTP status, for API errors
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Delay requested by the server before retrying
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { status, .. } => match status {
                429 => ErrorCategory::Throttled,
                502..=504 => ErrorCategory::Network,
                401 | 403 => ErrorCategory::Auth,
                404 => ErrorCategory::NotFound,
                400 | 422 => ErrorCategory::Rejected,
                409 | 412 => ErrorCategory::Conflict,
                _ => ErrorCategory::Other,
            },
            Self::Network(_) => ErrorCategory::Network,
            Self::InvalidResponse(_) => ErrorCategory::Format,
            Self::MissingToken(_) => ErrorCategory::Auth,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::from_response(code, "", None),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Parse a `Retry-After` header given in seconds
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
