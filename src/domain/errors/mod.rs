//! Domain error types.

mod api_error;
mod auth_error;
mod send_error;

pub use api_error::{ApiError, ErrorKind};
pub use auth_error::AuthError;
pub use send_error::SendError;
