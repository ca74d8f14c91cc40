use crate::domain::ConversationId;

/// Change notifications emitted by a [`ChatSession`](super::ChatSession) for
/// whatever drives the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The conversation list was refreshed or extended.
    ConversationsUpdated,
    /// The open conversation's history changed.
    MessagesUpdated(ConversationId),
    /// Unread counters changed after a mark-read.
    UnreadChanged(ConversationId),
    /// A remote message arrived in a conversation that is not open.
    NewMessage(ConversationId),
    /// Aggregate counters were refreshed.
    StatisticsUpdated,
    /// The server rejected the bearer token.
    LoginRequired,
}
