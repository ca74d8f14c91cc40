//! Recurring fetches keyed by subscription.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace};

use super::error_reporter::ErrorReporter;
use crate::domain::{ApiError, ConversationId, Report};

/// Shortest accepted interval; smaller values are clamped.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What a recurring fetch is subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollKey {
    /// The conversation list and its statistics.
    List,
    /// The open conversation's newest messages.
    Conversation(ConversationId),
}

impl std::fmt::Display for PollKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List => f.write_str("list"),
            Self::Conversation(id) => write!(f, "conversation-{id}"),
        }
    }
}

struct PollHandle {
    generation: u64,
    interval: Duration,
    task: JoinHandle<()>,
}

/// Registry of recurring poll tasks, at most one per [`PollKey`].
///
/// Each task awaits its tick before waiting for the next one, so ticks of a
/// key never overlap; ticks that fall due while one is still running are
/// skipped. Stopping a key aborts its task, dropping any request in flight.
pub struct PollScheduler {
    handles: Mutex<HashMap<PollKey, PollHandle>>,
    next_generation: AtomicU64,
    reporter: Option<Arc<ErrorReporter>>,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PollScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            reporter: None,
        }
    }

    /// Routes tick failures through `reporter` instead of only logging them.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Starts polling `key`, replacing any running task for it.
    ///
    /// The first tick fires one `interval` after the call. Returns the
    /// generation assigned to the new task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<F, Fut>(&self, key: PollKey, interval: Duration, mut tick: F) -> u64
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let reporter = self.reporter.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                trace!(%key, generation, "Poll tick");

                if let Err(e) = tick().await {
                    match &reporter {
                        Some(reporter) => reporter.report(Report::silent("poll", e)),
                        None => tracing::warn!(%key, error = %e, "Poll tick failed"),
                    }
                }
            }
        });

        let previous = self.handles.lock().insert(
            key,
            PollHandle {
                generation,
                interval,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.task.abort();
            debug!(%key, old = previous.generation, new = generation, "Replaced poll task");
        } else {
            debug!(%key, generation, interval_ms = interval.as_millis(), "Started poll task");
        }

        generation
    }

    /// Stops polling `key`. Returns whether a task was running.
    pub fn stop(&self, key: PollKey) -> bool {
        let removed = self.handles.lock().remove(&key);
        match removed {
            Some(handle) => {
                handle.task.abort();
                debug!(%key, generation = handle.generation, "Stopped poll task");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let drained: Vec<_> = self.handles.lock().drain().collect();
        for (key, handle) in drained {
            handle.task.abort();
            debug!(%key, generation = handle.generation, "Stopped poll task");
        }
    }

    #[must_use]
    pub fn is_active(&self, key: PollKey) -> bool {
        self.handles
            .lock()
            .get(&key)
            .is_some_and(|h| !h.task.is_finished())
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Generation of the task currently registered for `key`.
    #[must_use]
    pub fn generation(&self, key: PollKey) -> Option<u64> {
        self.handles.lock().get(&key).map(|h| h.generation)
    }

    #[must_use]
    pub fn interval(&self, key: PollKey) -> Option<Duration> {
        self.handles.lock().get(&key).map(|h| h.interval)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_tick(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<(), ApiError>> + Send + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_interval() {
        let scheduler = PollScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler.start(PollKey::List, Duration::from_secs(10), counting_tick(&ticks));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_same_key_keeps_one_handle() {
        let scheduler = PollScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let key = PollKey::Conversation(ConversationId(7));

        let g1 = scheduler.start(key, Duration::from_secs(5), counting_tick(&first));
        let g2 = scheduler.start(key, Duration::from_secs(5), counting_tick(&second));

        assert_eq!(scheduler.active_count(), 1);
        assert_eq!(scheduler.generation(key), Some(g2));
        assert!(g2 > g1);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks() {
        let scheduler = PollScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler.start(PollKey::List, Duration::from_secs(1), counting_tick(&ticks));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(scheduler.stop(PollKey::List));
        assert!(!scheduler.stop(PollKey::List));
        assert!(!scheduler.is_active(PollKey::List));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_ticks_never_overlap() {
        let scheduler = PollScheduler::new();
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let (r, m, c) = (running.clone(), max_seen.clone(), completed.clone());
        scheduler.start(PollKey::List, Duration::from_secs(5), move || {
            let (r, m, c) = (r.clone(), m.clone(), c.clone());
            async move {
                let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(12)).await;
                r.fetch_sub(1, Ordering::SeqCst);
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(completed.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_stop_the_timer() {
        let scheduler = PollScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();
        scheduler.start(PollKey::List, Duration::from_secs(1), move || {
            t.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(ApiError::network("offline")))
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_active(PollKey::List));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_and_drop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        {
            let scheduler = PollScheduler::new();
            scheduler.start(PollKey::List, Duration::from_secs(1), counting_tick(&ticks));
            scheduler.start(
                PollKey::Conversation(ConversationId(1)),
                Duration::from_secs(1),
                counting_tick(&ticks),
            );
            assert_eq!(scheduler.active_count(), 2);
            scheduler.stop_all();
            assert_eq!(scheduler.active_count(), 0);

            scheduler.start(PollKey::List, Duration::from_secs(1), counting_tick(&ticks));
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(PollKey::List.to_string(), "list");
        assert_eq!(
            PollKey::Conversation(ConversationId(9)).to_string(),
            "conversation-9"
        );
    }
}
