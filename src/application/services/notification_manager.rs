use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::{Notification, NotificationLevel, NotificationTag};

/// FIFO of in-app toasts; the front one expires after its duration once
/// displayed.
#[derive(Debug)]
pub struct NotificationManager {
    queue: VecDeque<Notification>,
    default_duration: Duration,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl NotificationManager {
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            default_duration,
        }
    }

    pub fn notify(
        &mut self,
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) {
        let notification =
            Notification::new(level, title, message).with_duration(self.default_duration);
        self.queue.push_back(notification);
    }

    /// Queues a fully built toast, keeping its own duration.
    pub fn push(&mut self, notification: Notification) {
        self.queue.push_back(notification);
    }

    pub fn info(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, title, message);
    }

    pub fn warn(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notify(NotificationLevel::Warn, title, message);
    }

    pub fn error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, title, message);
    }

    /// Removes every toast carrying `tag`. Returns how many were removed.
    pub fn dismiss(&mut self, tag: &NotificationTag) -> usize {
        let before = self.queue.len();
        self.queue.retain(|n| n.tag.as_ref() != Some(tag));
        let removed = before - self.queue.len();
        if removed > 0
            && let Some(front) = self.queue.front_mut()
        {
            front.mark_displayed();
        }
        removed
    }

    pub fn tick(&mut self) {
        if let Some(front) = self.queue.front_mut() {
            front.mark_displayed();
            if front.is_expired() {
                self.queue.pop_front();
                if let Some(next) = self.queue.front_mut() {
                    next.mark_displayed();
                }
            }
        }
    }

    /// Returns the toasts that were never displayed and marks them displayed.
    ///
    /// For surfaces that show every toast at once instead of one at a time.
    pub fn take_undisplayed(&mut self) -> Vec<Notification> {
        self.queue
            .iter_mut()
            .filter(|n| n.displayed_at.is_none())
            .map(|n| {
                n.mark_displayed();
                n.clone()
            })
            .collect()
    }

    /// Drops every toast whose display time has run out.
    pub fn purge_expired(&mut self) {
        self.queue.retain(|n| !n.is_expired());
    }

    #[must_use]
    pub fn current_notification(&self) -> Option<&Notification> {
        self.queue.front()
    }

    #[must_use]
    pub fn has_notifications(&self) -> bool {
        !self.queue.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }
}
