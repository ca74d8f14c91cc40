//! Classified errors from the conversation server.

use thiserror::Error;

/// Classification of a failed server interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response reached the client (connect failure, timeout).
    Network,
    /// 401: the bearer token was rejected.
    Authentication,
    /// 403: the operator may not perform the action.
    Authorization,
    /// Any other 4xx.
    Validation,
    /// 404.
    NotFound,
    /// 5xx.
    Server,
    /// Unclassified failures, including malformed payloads.
    Unknown,
}

impl ErrorKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            400..=499 => Self::Validation,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Returns whether repeating the same request can reasonably succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server | Self::Unknown)
    }

    /// Fixed operator-facing text for this classification.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Network => {
                "Unable to connect to the server. Please check your internet connection."
            }
            Self::Authentication => "Your session has expired. Please log in again.",
            Self::Authorization => "You do not have permission to perform this action.",
            Self::Validation => "Please check your input and try again.",
            Self::NotFound => "The requested conversation could not be found.",
            Self::Server => "Server error. Please try again later.",
            Self::Unknown => "An unexpected error occurred. Please try again.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::NotFound => "not found",
            Self::Server => "server",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Error returned by every conversation server call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
}

impl ApiError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Creates an error from a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Creates validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates error for a payload that does not match its schema.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Unknown,
            format!("malformed response: {}", message.into()),
        )
    }

    /// Creates unknown error.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Detail text, usually the server's own message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns whether the operator has to log in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication)
    }

    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}
