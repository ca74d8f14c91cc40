//! Errors raised by the send pipeline.

use thiserror::Error;

use super::ApiError;

#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SendError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("a message is already being sent")]
    InFlight,

    #[error("no conversation is selected")]
    NoConversation,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SendError {
    /// Returns the underlying server error, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}
