use std::time::{Duration, Instant};

use super::entities::ConversationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warn,
    Error,
}

/// In-app transient alert (toast).
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub tag: Option<NotificationTag>,
    pub retryable: bool,
    pub created_at: Instant,
    pub displayed_at: Option<Instant>,
    pub duration: Duration,
}

impl Notification {
    #[must_use]
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            tag: None,
            retryable: false,
            created_at: Instant::now(),
            displayed_at: None,
            duration: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: NotificationTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Marks the alert as offering a retry action.
    #[must_use]
    pub const fn with_retry(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.displayed_at
            .is_some_and(|start| start.elapsed() > self.duration)
    }

    pub fn mark_displayed(&mut self) {
        if self.displayed_at.is_none() {
            self.displayed_at = Some(Instant::now());
        }
    }
}

/// De-duplication key shared by the toast and the OS notification for
/// one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationTag(String);

impl NotificationTag {
    const CONVERSATION_PREFIX: &'static str = "conversation-";

    #[must_use]
    pub fn for_conversation(id: ConversationId) -> Self {
        Self(format!("{}{id}", Self::CONVERSATION_PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Conversation the tag was built for.
    #[must_use]
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.0
            .strip_prefix(Self::CONVERSATION_PREFIX)
            .and_then(|id| id.parse().ok())
            .map(ConversationId)
    }
}

impl std::fmt::Display for NotificationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// OS-level notification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsNotification {
    pub tag: NotificationTag,
    pub title: String,
    pub body: String,
}

/// Whether the operator allowed OS-level notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_creation() {
        let n = Notification::new(NotificationLevel::Info, "Title", "Message");
        assert_eq!(n.level, NotificationLevel::Info);
        assert_eq!(n.title, "Title");
        assert_eq!(n.message, "Message");
        assert!(n.tag.is_none());
        assert_eq!(n.duration, Duration::from_secs(5));
    }

    #[test]
    fn test_notification_expiry() {
        let mut n = Notification::new(NotificationLevel::Info, "Title", "Message")
            .with_duration(Duration::from_nanos(1));
        n.mark_displayed();
        std::thread::sleep(Duration::from_millis(1));
        assert!(n.is_expired());
    }

    #[test]
    fn test_tag_round_trip() {
        let tag = NotificationTag::for_conversation(ConversationId(42));
        assert_eq!(tag.as_str(), "conversation-42");
        assert_eq!(tag.conversation_id(), Some(ConversationId(42)));
    }
}
