//! Conversation summary shown in the list view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, SenderRole};

/// Identifier of a conversation (one citizen thread).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub u64);

impl ConversationId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConversationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Digest of the newest message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    /// Message id; the only field used to detect change.
    pub id: MessageId,
    /// Author role.
    pub sender_role: SenderRole,
    /// Body text.
    pub text: String,
    /// Server timestamp.
    pub created_at: DateTime<Utc>,
}

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation id.
    pub conversation_id: ConversationId,
    /// Citizen display name, if the server knows it.
    pub display_name: Option<String>,
    /// Citizen phone number, if the server knows it.
    pub phone: Option<String>,
    /// Newest message, absent for an empty conversation.
    pub last_message: Option<LastMessage>,
    /// Messages the operator has not read.
    pub unread_count: u32,
    /// Whether the server flags the conversation as new.
    pub is_new: bool,
    /// Timestamp of the latest activity.
    pub last_activity: DateTime<Utc>,
}

impl ConversationSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new(conversation_id: ConversationId, last_activity: DateTime<Utc>) -> Self {
        Self {
            conversation_id,
            display_name: None,
            phone: None,
            last_message: None,
            unread_count: 0,
            is_new: false,
            last_activity,
        }
    }

    /// Sets the last message digest.
    #[must_use]
    pub fn with_last_message(mut self, last_message: LastMessage) -> Self {
        self.last_message = Some(last_message);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the unread counter.
    #[must_use]
    pub fn with_unread_count(mut self, count: u32) -> Self {
        self.unread_count = count;
        self
    }

    /// Name to show to the operator.
    #[must_use]
    pub fn display_label(&self) -> String {
        self.display_name
            .as_ref()
            .filter(|name| !name.trim().is_empty())
            .map_or_else(
                || format!("Conversation {}", self.conversation_id),
                |name| name.trim().to_string(),
            )
    }

    /// Id of the newest message, if any.
    #[must_use]
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.last_message.as_ref().map(|m| m.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_fallback() {
        let summary = ConversationSummary::new(ConversationId(42), Utc::now());
        assert_eq!(summary.display_label(), "Conversation 42");

        let named = summary.with_display_name("  Rahim Uddin ");
        assert_eq!(named.display_label(), "Rahim Uddin");
    }

    #[test]
    fn test_blank_name_falls_back() {
        let summary = ConversationSummary::new(ConversationId(3), Utc::now()).with_display_name(" ");
        assert_eq!(summary.display_label(), "Conversation 3");
    }
}
