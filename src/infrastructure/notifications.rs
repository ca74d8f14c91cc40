//! Desktop notifications and focus tracking for the console binary.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::notification::{NotificationTag, OsNotification, PermissionState};
use crate::domain::ports::{FocusPort, NotificationPort};

const APP_NAME: &str = "Chat Sync";
const DEFAULT_ACTION: &str = "default";

/// How a shown desktop notification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOutcome {
    /// The operator clicked it.
    Activated,
    /// It expired, was dismissed or was closed by the application.
    Closed,
}

/// The notification daemon.
pub trait DesktopSurface: Send + Sync + 'static {
    /// Shows `notification`, replacing the bubble `replaces` when given.
    ///
    /// Blocks until the bubble is clicked or closed. `shown` receives the
    /// daemon id as soon as it is known.
    fn present(
        &self,
        notification: &OsNotification,
        replaces: Option<u32>,
        shown: &mut dyn FnMut(u32),
    ) -> Result<SurfaceOutcome, String>;

    /// Closes the bubble with daemon id `id`.
    fn close(&self, id: u32);
}

/// [`DesktopSurface`] backed by `notify-rust`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyRustSurface;

impl DesktopSurface for NotifyRustSurface {
    #[cfg(all(unix, not(target_os = "macos")))]
    fn present(
        &self,
        notification: &OsNotification,
        replaces: Option<u32>,
        shown: &mut dyn FnMut(u32),
    ) -> Result<SurfaceOutcome, String> {
        let mut desktop = notify_rust::Notification::new();
        desktop
            .summary(&notification.title)
            .body(&notification.body)
            .appname(APP_NAME)
            .action(DEFAULT_ACTION, "Open");
        if let Some(id) = replaces {
            desktop.id(id);
        }

        let handle = desktop.show().map_err(|e| e.to_string())?;
        shown(handle.id());

        let mut outcome = SurfaceOutcome::Closed;
        handle.wait_for_action(|action| {
            if action == DEFAULT_ACTION {
                outcome = SurfaceOutcome::Activated;
            }
        });
        Ok(outcome)
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn present(
        &self,
        notification: &OsNotification,
        _replaces: Option<u32>,
        shown: &mut dyn FnMut(u32),
    ) -> Result<SurfaceOutcome, String> {
        let _handle = notify_rust::Notification::new()
            .summary(&notification.title)
            .body(&notification.body)
            .appname(APP_NAME)
            .show()
            .map_err(|e| e.to_string())?;
        shown(0);
        Ok(SurfaceOutcome::Closed)
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn close(&self, id: u32) {
        // notify-rust closes only through a handle; replacing the bubble yields one.
        let mut stub = notify_rust::Notification::new();
        stub.appname(APP_NAME)
            .id(id)
            .timeout(notify_rust::Timeout::Milliseconds(1));
        match stub.show() {
            Ok(handle) => handle.close(),
            Err(e) => warn!(id, "Failed to close notification: {}", e),
        }
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn close(&self, id: u32) {
        debug!(id, "Desktop notifications cannot be closed on this platform");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiveRecord {
    id: u32,
    serial: u64,
}

type LiveMap = Arc<Mutex<HashMap<NotificationTag, LiveRecord>>>;

/// Runs `job` on the blocking pool, or inline outside a runtime.
fn run_blocking<F: FnOnce() + Send + 'static>(job: F) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(job);
        }
        Err(_) => job(),
    }
}

/// Desktop notification service.
///
/// Desktop notification daemons have no permission prompt, so permission is
/// the configuration switch: `Default` until requested, then `Granted` when
/// enabled and `Denied` otherwise. Clicks are forwarded as tags to the
/// receiver returned by [`subscribe_activations`](Self::subscribe_activations).
pub struct DesktopNotificationService {
    enabled: bool,
    permission: Mutex<PermissionState>,
    surface: Arc<dyn DesktopSurface>,
    live: LiveMap,
    next_serial: AtomicU64,
    activations: Arc<Mutex<Option<mpsc::UnboundedSender<NotificationTag>>>>,
}

impl DesktopNotificationService {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self::with_surface(enabled, Arc::new(NotifyRustSurface))
    }

    #[must_use]
    pub fn with_surface(enabled: bool, surface: Arc<dyn DesktopSurface>) -> Self {
        Self {
            enabled,
            permission: Mutex::new(if enabled {
                PermissionState::Default
            } else {
                PermissionState::Denied
            }),
            surface,
            live: Arc::new(Mutex::new(HashMap::new())),
            next_serial: AtomicU64::new(0),
            activations: Arc::new(Mutex::new(None)),
        }
    }

    /// Receiver of the tags of clicked notifications. A later call replaces
    /// the previous receiver.
    pub fn subscribe_activations(&self) -> mpsc::UnboundedReceiver<NotificationTag> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.activations.lock() = Some(tx);
        rx
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

#[async_trait]
impl NotificationPort for DesktopNotificationService {
    fn permission(&self) -> PermissionState {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> PermissionState {
        let answer = if self.enabled {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        *self.permission.lock() = answer;
        answer
    }

    fn show(&self, notification: &OsNotification) {
        if !self.enabled || !self.permission().is_granted() {
            return;
        }

        let notification = notification.clone();
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let replaces = self.live.lock().get(&notification.tag).map(|r| r.id);
        let surface = self.surface.clone();
        let live = self.live.clone();
        let activations = self.activations.clone();

        run_blocking(move || {
            let tag = notification.tag.clone();
            let outcome = surface.present(&notification, replaces, &mut |id| {
                live.lock().insert(tag.clone(), LiveRecord { id, serial });
                debug!(%tag, id, "Shown desktop notification");
            });

            // A newer bubble for the tag, or a close, owns the record now.
            let current = {
                let mut live = live.lock();
                let ours = live.get(&tag).is_some_and(|r| r.serial == serial);
                if ours {
                    live.remove(&tag);
                }
                ours
            };

            match outcome {
                Ok(SurfaceOutcome::Activated) if current => {
                    let sender = activations.lock().clone();
                    if let Some(sender) = sender
                        && sender.send(tag.clone()).is_err()
                    {
                        debug!(%tag, "No activation receiver");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(%tag, "Failed to show notification: {}", e),
            }
        });
    }

    fn close(&self, tag: &NotificationTag) {
        let Some(record) = self.live.lock().remove(tag) else {
            return;
        };
        debug!(%tag, id = record.id, "Closing desktop notification");
        let surface = self.surface.clone();
        run_blocking(move || surface.close(record.id));
    }
}

/// Focus state of the console window.
///
/// A terminal cannot observe window focus, so the state is whatever the
/// operator last reported; it starts unfocused so desktop notifications
/// are shown.
#[derive(Debug, Default)]
pub struct TerminalFocus {
    focused: AtomicBool,
}

impl TerminalFocus {
    #[must_use]
    pub fn new(focused: bool) -> Self {
        Self {
            focused: AtomicBool::new(focused),
        }
    }

    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }
}

impl FocusPort for TerminalFocus {
    fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn focus(&self) {
        self.set_focused(true);
        debug!("Console focused by notification activation");
    }
}
