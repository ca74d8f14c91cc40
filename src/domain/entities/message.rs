use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ConversationId;

/// Server-assigned message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Who wrote a message, from the operator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SenderRole {
    /// Written by an administrator (this operator or a colleague).
    Admin,
    /// Written by the citizen on the other end.
    Remote,
}

impl SenderRole {
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::Remote)
    }
}

/// A server-confirmed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    sender_id: u64,
    sender_role: SenderRole,
    text: String,
    attachment_url: Option<String>,
    voice_url: Option<String>,
    read: bool,
    created_at: DateTime<Utc>,
}

#[allow(missing_docs)]
impl Message {
    #[must_use]
    pub fn new(
        id: impl Into<MessageId>,
        conversation_id: ConversationId,
        sender_id: u64,
        sender_role: SenderRole,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id,
            sender_id,
            sender_role,
            text: text.into(),
            attachment_url: None,
            voice_url: None,
            read: false,
            created_at,
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachment_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_voice(mut self, url: impl Into<String>) -> Self {
        self.voice_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    #[must_use]
    pub const fn sender_id(&self) -> u64 {
        self.sender_id
    }

    #[must_use]
    pub const fn sender_role(&self) -> SenderRole {
        self.sender_role
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn attachment_url(&self) -> Option<&str> {
        self.attachment_url.as_deref()
    }

    #[must_use]
    pub fn voice_url(&self) -> Option<&str> {
        self.voice_url.as_deref()
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Local echo of a successful mark-read call.
    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

/// A message composed locally that the server has not confirmed yet.
///
/// It carries a client reference instead of a server id; the confirmed
/// [`Message`] returned by the send call replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Client-side reference used for log correlation.
    pub client_ref: Uuid,
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Message body.
    pub text: String,
    /// Already uploaded attachment.
    pub attachment_url: Option<String>,
    /// When the operator submitted it.
    pub created_at: DateTime<Utc>,
}

impl OutgoingMessage {
    /// Creates a provisional message stamped with the current time.
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        text: impl Into<String>,
        attachment_url: Option<String>,
    ) -> Self {
        Self {
            client_ref: Uuid::new_v4(),
            conversation_id,
            text: text.into(),
            attachment_url,
            created_at: Utc::now(),
        }
    }
}
