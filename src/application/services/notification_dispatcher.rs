//! Fan-out of new-message events to toasts and OS notifications.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::new_message_detector::NewMessageEvent;
use super::notification_manager::NotificationManager;
use crate::domain::notification::OsNotification;
use crate::domain::ports::{FocusPort, NotificationPort};
use crate::domain::{ConversationId, Notification, NotificationLevel, NotificationTag, PermissionState};

/// Default number of characters kept in a message preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 50;
/// Default lifetime of a new-message toast.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(6);

/// OS notification permission, read lazily once and then cached for the
/// lifetime of the gate.
pub struct PermissionGate {
    port: Arc<dyn NotificationPort>,
    state: Mutex<Option<PermissionState>>,
}

impl PermissionGate {
    #[must_use]
    pub fn new(port: Arc<dyn NotificationPort>) -> Self {
        Self {
            port,
            state: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> PermissionState {
        *self.state.lock().get_or_insert_with(|| self.port.permission())
    }

    /// Asks the platform and stores the answer.
    pub async fn request(&self) -> PermissionState {
        let answer = self.port.request_permission().await;
        *self.state.lock() = Some(answer);
        info!(?answer, "Notification permission answered");
        answer
    }
}

/// Which surfaces a dispatch reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub toast: bool,
    pub os: bool,
}

/// Tuning for the texts the dispatcher produces.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherSettings {
    pub toast_duration: Duration,
    pub preview_chars: usize,
    /// When false only in-app toasts are produced.
    pub desktop: bool,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            toast_duration: DEFAULT_TOAST_DURATION,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            desktop: true,
        }
    }
}

pub struct NotificationDispatcher {
    toasts: Arc<Mutex<NotificationManager>>,
    os: Arc<dyn NotificationPort>,
    focus: Arc<dyn FocusPort>,
    permission: PermissionGate,
    live: Mutex<HashMap<NotificationTag, OsNotification>>,
    settings: DispatcherSettings,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(
        toasts: Arc<Mutex<NotificationManager>>,
        os: Arc<dyn NotificationPort>,
        focus: Arc<dyn FocusPort>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            toasts,
            permission: PermissionGate::new(os.clone()),
            os,
            focus,
            live: Mutex::new(HashMap::new()),
            settings,
        }
    }

    #[must_use]
    pub const fn permission(&self) -> &PermissionGate {
        &self.permission
    }

    /// Asks for OS permission if the operator has not answered yet.
    pub async fn request_permission(&self) -> PermissionState {
        match self.permission.state() {
            PermissionState::Default => self.permission.request().await,
            answered => answered,
        }
    }

    /// Always queues a toast; also shows an OS notification when permitted
    /// and the application is not focused.
    pub fn dispatch(&self, event: &NewMessageEvent) -> DispatchOutcome {
        let conversation = &event.conversation;
        let tag = NotificationTag::for_conversation(conversation.conversation_id);
        let title = format!("New message from {}", conversation.display_label());
        let preview = conversation
            .last_message
            .as_ref()
            .map_or_else(String::new, |m| preview(&m.text, self.settings.preview_chars));

        let toast_body = match &conversation.phone {
            Some(phone) if !phone.is_empty() => format!("{preview}\n{phone}"),
            _ => preview.clone(),
        };
        self.toasts.lock().push(
            Notification::new(NotificationLevel::Info, title.clone(), toast_body)
                .with_tag(tag.clone())
                .with_duration(self.settings.toast_duration),
        );

        let os = self.settings.desktop
            && self.permission.state().is_granted()
            && !self.focus.is_focused();
        if os {
            let notification = OsNotification {
                tag: tag.clone(),
                title,
                body: preview,
            };
            if self
                .live
                .lock()
                .insert(tag.clone(), notification.clone())
                .is_some()
            {
                debug!(%tag, "Replacing live OS notification");
            }
            self.os.show(&notification);
        }

        debug!(%tag, os, "Dispatched new-message notification");
        DispatchOutcome { toast: true, os }
    }

    /// Handles a click on either surface: focuses the application, dismisses
    /// everything carrying `tag` and returns the conversation to open.
    pub fn activate(&self, tag: &NotificationTag) -> Option<ConversationId> {
        self.focus.focus();
        self.dismiss(tag);
        tag.conversation_id()
    }

    /// Removes the toasts and the live OS notification carrying `tag`.
    pub fn dismiss(&self, tag: &NotificationTag) {
        let removed = self.toasts.lock().dismiss(tag);
        let live = self.live.lock().remove(tag).is_some();
        if live {
            self.os.close(tag);
        }
        if removed > 0 || live {
            debug!(%tag, toasts = removed, os = live, "Dismissed notifications");
        }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

/// First `max_chars` characters of `text`, with "..." when cut.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
