//! Validation and submission of operator messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::history_pager::PagedList;
use crate::domain::entities::{ConversationId, Message, OutgoingMessage};
use crate::domain::errors::SendError;
use crate::domain::ports::ChatApiPort;

/// Body used when only an attachment is sent.
pub const ATTACHMENT_ONLY_TEXT: &str = "Image";

/// An attachment picked in the composer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAttachment {
    /// Uploaded location, once known.
    pub url: Option<String>,
    /// Whether the upload finished.
    pub ready: bool,
}

impl PendingAttachment {
    #[must_use]
    pub const fn uploading() -> Self {
        Self {
            url: None,
            ready: false,
        }
    }

    #[must_use]
    pub fn uploaded(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ready: true,
        }
    }
}

/// Pending operator input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    pub text: String,
    pub attachment: Option<PendingAttachment>,
}

impl Composer {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: PendingAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.attachment = None;
    }

    /// Builds the message to send, or explains why it cannot be sent.
    pub fn validate(&self, conversation_id: ConversationId) -> Result<OutgoingMessage, SendError> {
        let text = self.text.trim();

        let attachment_url = match &self.attachment {
            None => None,
            Some(PendingAttachment {
                url: Some(url),
                ready: true,
            }) => Some(url.clone()),
            Some(_) => {
                return Err(SendError::Invalid(
                    "Please wait for the attachment to finish uploading",
                ));
            }
        };

        if text.is_empty() && attachment_url.is_none() {
            return Err(SendError::Invalid("Please enter a message or attach a file"));
        }

        let text = if text.is_empty() {
            ATTACHMENT_ONLY_TEXT
        } else {
            text
        };
        Ok(OutgoingMessage::new(conversation_id, text, attachment_url))
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Confirm-then-append message submission with a single in-flight slot.
pub struct SendPipeline {
    api: Arc<dyn ChatApiPort>,
    in_flight: AtomicBool,
}

impl SendPipeline {
    #[must_use]
    pub fn new(api: Arc<dyn ChatApiPort>) -> Self {
        Self {
            api,
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Validates `composer` and sends it, returning the server-confirmed
    /// message. The composer itself is left for the caller to clear.
    pub async fn submit(
        &self,
        conversation_id: ConversationId,
        composer: &Composer,
    ) -> Result<Message, SendError> {
        let outgoing = composer.validate(conversation_id)?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Send rejected, another one is in flight");
            return Err(SendError::InFlight);
        }
        let _guard = InFlight(&self.in_flight);

        debug!(conversation = %conversation_id, client_ref = %outgoing.client_ref, "Sending message");
        let confirmed = self.api.send_message(&outgoing).await?;
        info!(client_ref = %outgoing.client_ref, id = %confirmed.id(), "Message confirmed");
        Ok(confirmed)
    }
}

/// Appends a confirmed message unless a poll already delivered it, then
/// clears the composer. Returns whether the message was appended.
pub fn apply_confirmed(
    history: &mut PagedList<Message>,
    composer: &mut Composer,
    message: Message,
) -> bool {
    composer.clear();
    history.push_if_absent(message)
}
