//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// In-app and OS notification types.
pub mod notification;
/// Port definitions.
pub mod ports;
/// Severity-tagged error reports.
pub mod report;

pub use entities::{AuthToken, ConversationId, ConversationSummary, Message, MessageId};
pub use errors::{ApiError, AuthError, ErrorKind};
pub use notification::{Notification, NotificationLevel, NotificationTag, PermissionState};
pub use report::{Report, Severity};
