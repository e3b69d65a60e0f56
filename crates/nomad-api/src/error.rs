//! Error types for Nomad API operations.
//!
//! Errors are categorized so callers can tell a missing object apart from a
//! rejected request or an unreachable cluster without string matching.

use std::fmt;

/// Result type alias for Nomad API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The object does not exist (HTTP 404).
    NotFound,
    /// The request was rejected by the server (other 4xx).
    Rejected,
    /// The server failed to handle the request (5xx).
    Server,
    /// The server could not be reached.
    Network,
    /// The response could not be decoded.
    Format,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    ///
    /// Nothing in this crate retries; the flag is for schedulers built on top.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Object not found",
            Self::Rejected => "Request rejected",
            Self::Server => "Server error",
            Self::Network => "Network connectivity issue",
            Self::Format => "Invalid response format",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the id and namespace are correct",
            Self::Rejected => "Check the spec and the ACL token permissions",
            Self::Server => "Check the Nomad server logs and try again",
            Self::Network => "Check NOMAD_ADDR and that the cluster is reachable",
            Self::Format => "The server and client versions may be incompatible",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the Nomad API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-success status code.
    #[error("Unexpected response code: {status} ({body})")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, usually the server's error message.
        body: String,
    },

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Shorthand for a 404 response.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::status(404, what)
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Status { status: 404, .. } => ErrorCategory::NotFound,
            Error::Status { status, .. } if (400..500).contains(status) => ErrorCategory::Rejected,
            Error::Status { status, .. } if *status >= 500 => ErrorCategory::Server,
            Error::Status { .. } => ErrorCategory::Other,
            Error::Transport(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether the server reported that the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Status {
                status: code,
                body: String::new(),
            },
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
