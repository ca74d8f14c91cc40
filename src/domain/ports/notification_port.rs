use async_trait::async_trait;

use crate::domain::notification::{NotificationTag, OsNotification, PermissionState};

/// Port for OS-level notifications.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Current permission as reported by the platform.
    fn permission(&self) -> PermissionState;

    /// Asks the operator for permission.
    async fn request_permission(&self) -> PermissionState;

    /// Shows a notification; one with the same tag replaces the previous.
    fn show(&self, notification: &OsNotification);

    /// Closes the live notification with this tag, if any.
    fn close(&self, tag: &NotificationTag);
}

/// Port for the application window.
pub trait FocusPort: Send + Sync {
    /// Whether the operator is looking at the application.
    fn is_focused(&self) -> bool;

    /// Brings the application to the front.
    fn focus(&self);
}
