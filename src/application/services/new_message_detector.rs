//! Detection of newly arrived remote messages across list snapshots.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::domain::entities::{ConversationId, ConversationSummary, MessageId};

/// A remote message the operator has not seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessageEvent {
    /// The conversation as it appeared in the snapshot that revealed the message.
    pub conversation: ConversationSummary,
}

impl NewMessageEvent {
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.conversation.conversation_id
    }

    #[must_use]
    pub fn message_id(&self) -> Option<MessageId> {
        self.conversation.last_message_id()
    }
}

/// Compares successive conversation list snapshots.
///
/// Only the newest message id of each conversation is remembered. The first
/// snapshot after construction or [`reset`](Self::reset) seeds the baseline
/// and never emits.
#[derive(Debug, Default)]
pub struct NewMessageDetector {
    baseline: Option<HashMap<ConversationId, Option<MessageId>>>,
}

impl NewMessageDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares `current` with the previous snapshot, then stores `current`
    /// as the new baseline.
    ///
    /// `open` is the conversation the operator is looking at; changes there
    /// are already visible and do not emit.
    pub fn observe(
        &mut self,
        current: &[ConversationSummary],
        open: Option<ConversationId>,
    ) -> Vec<NewMessageEvent> {
        let snapshot: HashMap<_, _> = current
            .iter()
            .map(|c| (c.conversation_id, c.last_message_id()))
            .collect();

        let Some(previous) = self.baseline.replace(snapshot) else {
            debug!(conversations = current.len(), "Seeded new-message baseline");
            return Vec::new();
        };

        let events: Vec<_> = current
            .iter()
            .filter(|conversation| Self::is_new(conversation, &previous, open))
            .map(|conversation| NewMessageEvent {
                conversation: conversation.clone(),
            })
            .collect();

        if !events.is_empty() {
            debug!(count = events.len(), "Detected new remote messages");
        }
        events
    }

    fn is_new(
        conversation: &ConversationSummary,
        previous: &HashMap<ConversationId, Option<MessageId>>,
        open: Option<ConversationId>,
    ) -> bool {
        let Some(last) = &conversation.last_message else {
            return false;
        };
        if !last.sender_role.is_remote() {
            return false;
        }

        match previous.get(&conversation.conversation_id) {
            // Brand-new conversations notify even when opened by deep link.
            None => true,
            // Both snapshots need a last message to compare.
            Some(None) => false,
            Some(Some(previous_id)) => {
                let changed = *previous_id != last.id;
                if changed && open == Some(conversation.conversation_id) {
                    trace!(id = %conversation.conversation_id, "Skipping open conversation");
                    return false;
                }
                changed
            }
        }
    }

    /// Forgets the baseline; the next snapshot only re-seeds it.
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    #[must_use]
    pub const fn is_seeded(&self) -> bool {
        self.baseline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{LastMessage, SenderRole};
    use chrono::Utc;

    fn conv(id: u64, last: Option<(u64, SenderRole)>) -> ConversationSummary {
        let mut summary = ConversationSummary::new(ConversationId(id), Utc::now());
        if let Some((msg, role)) = last {
            summary = summary.with_last_message(LastMessage {
                id: MessageId(msg),
                sender_role: role,
                text: format!("message {msg}"),
                created_at: Utc::now(),
            });
        }
        summary
    }

    #[test]
    fn test_first_observation_only_seeds() {
        let mut detector = NewMessageDetector::new();
        let events = detector.observe(&[conv(1, Some((10, SenderRole::Remote)))], None);
        assert!(events.is_empty());
        assert!(detector.is_seeded());
    }

    #[test]
    fn test_changed_remote_message_emits() {
        let mut detector = NewMessageDetector::new();
        detector.observe(&[conv(1, Some((10, SenderRole::Remote)))], None);

        let events = detector.observe(&[conv(1, Some((11, SenderRole::Remote)))], None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].conversation_id(), ConversationId(1));
        assert_eq!(events[0].message_id(), Some(MessageId(11)));
    }

    #[test]
    fn test_open_conversation_does_not_emit() {
        let mut detector = NewMessageDetector::new();
        detector.observe(&[conv(1, Some((10, SenderRole::Remote)))], None);

        let events = detector.observe(
            &[conv(1, Some((11, SenderRole::Remote)))],
            Some(ConversationId(1)),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_own_messages_do_not_emit() {
        let mut detector = NewMessageDetector::new();
        detector.observe(&[conv(1, Some((10, SenderRole::Remote)))], None);

        let events = detector.observe(&[conv(1, Some((11, SenderRole::Admin)))], None);
        assert!(events.is_empty());
    }

    #[test]
    fn test_unchanged_snapshots_never_emit() {
        let mut detector = NewMessageDetector::new();
        let snapshot = vec![
            conv(1, Some((10, SenderRole::Remote))),
            conv(2, Some((20, SenderRole::Admin))),
        ];
        detector.observe(&snapshot, None);

        for _ in 0..1000 {
            assert!(detector.observe(&snapshot, None).is_empty());
        }
    }

    #[test]
    fn test_brand_new_conversation() {
        let mut detector = NewMessageDetector::new();
        detector.observe(&[conv(1, Some((10, SenderRole::Remote)))], None);

        let events = detector.observe(
            &[
                conv(1, Some((10, SenderRole::Remote))),
                conv(2, Some((30, SenderRole::Remote))),
                conv(3, Some((31, SenderRole::Admin))),
                conv(4, None),
            ],
            None,
        );
        let ids: Vec<_> = events.iter().map(NewMessageEvent::conversation_id).collect();
        assert_eq!(ids, vec![ConversationId(2)]);
    }

    #[test]
    fn test_first_message_in_empty_conversation_does_not_emit() {
        let mut detector = NewMessageDetector::new();
        detector.observe(&[conv(1, None)], None);

        let events = detector.observe(&[conv(1, Some((5, SenderRole::Remote)))], None);
        assert!(events.is_empty());

        let events = detector.observe(&[conv(1, Some((6, SenderRole::Remote)))], None);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_snapshot_replaces_baseline() {
        let mut detector = NewMessageDetector::new();
        detector.observe(&[conv(1, Some((10, SenderRole::Remote)))], None);
        assert_eq!(
            detector
                .observe(&[conv(1, Some((11, SenderRole::Remote)))], None)
                .len(),
            1
        );
        assert!(
            detector
                .observe(&[conv(1, Some((11, SenderRole::Remote)))], None)
                .is_empty()
        );
    }

    #[test]
    fn test_reset_reseeds() {
        let mut detector = NewMessageDetector::new();
        detector.observe(&[conv(1, Some((10, SenderRole::Remote)))], None);
        detector.reset();
        assert!(!detector.is_seeded());

        let events = detector.observe(&[conv(1, Some((99, SenderRole::Remote)))], None);
        assert!(events.is_empty());
    }
}
