//! One mark-read call per conversation selection.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::error_reporter::ErrorReporter;
use crate::domain::ports::ChatApiPort;
use crate::domain::{ConversationId, Report};

/// Result of a selection as seen by the read-state synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This selection was already marked.
    Skipped,
    /// The server accepted the mark-read call.
    Marked,
    /// The call failed; the failure was reported silently.
    Failed,
}

#[derive(Debug, Default)]
struct Selection {
    conversation: Option<ConversationId>,
    marked: bool,
}

/// Issues exactly one mark-read call per selection of a conversation.
pub struct ReadStateSync {
    api: Arc<dyn ChatApiPort>,
    reporter: Arc<ErrorReporter>,
    selection: Mutex<Selection>,
}

impl ReadStateSync {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApiPort>, reporter: Arc<ErrorReporter>) -> Self {
        Self {
            api,
            reporter,
            selection: Mutex::new(Selection::default()),
        }
    }

    /// Claims the mark for `id`. Returns false if this selection already
    /// issued one.
    fn claim(&self, id: ConversationId) -> bool {
        let mut selection = self.selection.lock();
        if selection.conversation != Some(id) {
            selection.conversation = Some(id);
            selection.marked = false;
        }
        if selection.marked {
            return false;
        }
        selection.marked = true;
        true
    }

    pub async fn on_select(&self, id: ConversationId) -> MarkOutcome {
        if !self.claim(id) {
            return MarkOutcome::Skipped;
        }

        match self.api.mark_read(id).await {
            Ok(()) => {
                debug!(conversation = %id, "Marked conversation as read");
                MarkOutcome::Marked
            }
            Err(e) => {
                self.reporter
                    .report(Report::silent("mark messages as read", e));
                MarkOutcome::Failed
            }
        }
    }

    /// Forgets the selection; the next `on_select` marks again.
    pub fn clear(&self) {
        *self.selection.lock() = Selection::default();
    }

    #[must_use]
    pub fn selected(&self) -> Option<ConversationId> {
        self.selection.lock().conversation
    }
}
