//! Severity-based routing of failures to logs and toasts.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, warn};

use super::notification_manager::NotificationManager;
use crate::application::events::SessionEvent;
use crate::domain::{ErrorKind, Notification, NotificationLevel, Report, Severity};

/// Single path for side-effect failures.
///
/// Silent reports are logged; user-visible reports also queue an error
/// toast. An authentication failure of either severity emits
/// [`SessionEvent::LoginRequired`].
pub struct ErrorReporter {
    toasts: Arc<Mutex<NotificationManager>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ErrorReporter {
    #[must_use]
    pub fn new(
        toasts: Arc<Mutex<NotificationManager>>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self { toasts, events }
    }

    pub fn report(&self, report: Report) {
        let Report {
            severity,
            context,
            error,
        } = report;

        match severity {
            Severity::Silent => {
                warn!(context, kind = %error.kind(), status = ?error.status(), error = %error, "Background operation failed");
            }
            Severity::UserVisible => {
                error!(context, kind = %error.kind(), status = ?error.status(), error = %error, "Operation failed");

                let body = if error.kind() == ErrorKind::Validation && !error.message().is_empty()
                {
                    error.message().to_string()
                } else {
                    error.user_message().to_string()
                };
                self.toasts.lock().push(
                    Notification::new(NotificationLevel::Error, format!("Failed to {context}"), body)
                        .with_retry(error.is_retryable()),
                );
            }
        }

        if error.requires_login() && self.events.send(SessionEvent::LoginRequired).is_err() {
            warn!("Session event receiver dropped; login prompt lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApiError;

    fn reporter() -> (
        ErrorReporter,
        Arc<Mutex<NotificationManager>>,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let toasts = Arc::new(Mutex::new(NotificationManager::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (ErrorReporter::new(toasts.clone(), tx), toasts, rx)
    }

    #[test]
    fn test_silent_reports_queue_nothing() {
        let (reporter, toasts, mut rx) = reporter();
        reporter.report(Report::silent("poll", ApiError::network("offline")));

        assert!(!toasts.lock().has_notifications());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_user_visible_report_queues_toast() {
        let (reporter, toasts, _rx) = reporter();
        reporter.report(Report::user_visible(
            "send message",
            ApiError::from_status(503, "maintenance"),
        ));

        let toasts = toasts.lock();
        let toast = toasts.current_notification().unwrap();
        assert_eq!(toast.title, "Failed to send message");
        assert_eq!(toast.message, "Server error. Please try again later.");
        assert!(toast.retryable);
    }

    #[test]
    fn test_validation_detail_is_shown() {
        let (reporter, toasts, _rx) = reporter();
        reporter.report(Report::user_visible(
            "send message",
            ApiError::validation("Message text is too long"),
        ));

        let toasts = toasts.lock();
        let toast = toasts.current_notification().unwrap();
        assert_eq!(toast.message, "Message text is too long");
        assert!(!toast.retryable);
    }

    #[test]
    fn test_unauthorized_emits_login_required() {
        let (reporter, _toasts, mut rx) = reporter();
        reporter.report(Report::silent("poll", ApiError::from_status(401, "expired")));

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::LoginRequired);
    }
}
