//! Orchestration of polling, detection, notification and sending for one
//! operator session.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::events::SessionEvent;
use super::services::error_reporter::ErrorReporter;
use super::services::history_pager::{Direction, MergeOutcome, PagedList, Viewport};
use super::services::new_message_detector::NewMessageDetector;
use super::services::notification_dispatcher::{DispatcherSettings, NotificationDispatcher};
use super::services::notification_manager::NotificationManager;
use super::services::poll_scheduler::{PollKey, PollScheduler};
use super::services::read_state::{MarkOutcome, ReadStateSync};
use super::services::send_pipeline::{Composer, PendingAttachment, SendPipeline, apply_confirmed};
use crate::domain::entities::{ChatStatistics, ConversationSummary, Message};
use crate::domain::errors::SendError;
use crate::domain::ports::{
    ChatApiPort, ConversationFilters, DEFAULT_MESSAGE_LIMIT, FocusPort, NotificationPort,
};
use crate::domain::{ApiError, ConversationId, NotificationTag, PermissionState, Report};

/// Timing and sizing of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub conversation_interval: Duration,
    pub list_interval: Duration,
    pub message_limit: u32,
    pub dispatcher: DispatcherSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            conversation_interval: Duration::from_secs(5),
            list_interval: Duration::from_secs(10),
            message_limit: DEFAULT_MESSAGE_LIMIT,
            dispatcher: DispatcherSettings::default(),
        }
    }
}

#[derive(Default)]
struct SessionState {
    filters: ConversationFilters,
    conversations: PagedList<ConversationSummary>,
    detector: NewMessageDetector,
    statistics: Option<ChatStatistics>,
    selected: Option<ConversationId>,
    selection_generation: u64,
    messages: PagedList<Message>,
    composer: Composer,
    viewport: Viewport,
}

impl SessionState {
    fn reset_selection(&mut self) {
        self.selection_generation += 1;
        self.messages.clear();
        self.composer.clear();
        self.viewport = Viewport::default();
    }
}

struct Inner {
    api: Arc<dyn ChatApiPort>,
    scheduler: PollScheduler,
    dispatcher: NotificationDispatcher,
    read_state: ReadStateSync,
    sender: SendPipeline,
    reporter: Arc<ErrorReporter>,
    toasts: Arc<Mutex<NotificationManager>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: Mutex<SessionState>,
    settings: SessionSettings,
}

/// One operator's view of the conversation server.
///
/// Cloning is cheap and every clone drives the same session. Poll tasks hold
/// only weak references, so dropping the last clone stops them as well.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    #[must_use]
    pub fn new(
        api: Arc<dyn ChatApiPort>,
        notifications: Arc<dyn NotificationPort>,
        focus: Arc<dyn FocusPort>,
        settings: SessionSettings,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let toasts = Arc::new(Mutex::new(NotificationManager::default()));
        let reporter = Arc::new(ErrorReporter::new(toasts.clone(), events.clone()));

        let inner = Inner {
            scheduler: PollScheduler::new().with_reporter(reporter.clone()),
            dispatcher: NotificationDispatcher::new(
                toasts.clone(),
                notifications,
                focus,
                settings.dispatcher,
            ),
            read_state: ReadStateSync::new(api.clone(), reporter.clone()),
            sender: SendPipeline::new(api.clone()),
            api,
            reporter,
            toasts,
            events,
            state: Mutex::new(SessionState::default()),
            settings,
        };

        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    fn emit(&self, event: SessionEvent) {
        if self.inner.events.send(event).is_err() {
            debug!(?event, "No session event receiver");
        }
    }

    fn report(&self, report: Report) {
        self.inner.reporter.report(report);
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Loads the first list page and starts polling it.
    pub async fn start(&self, filters: ConversationFilters) -> Result<(), ApiError> {
        let result = self.set_filters(filters).await;

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .scheduler
            .start(PollKey::List, self.inner.settings.list_interval, move || {
                let session = Self::upgrade(&weak);
                async move {
                    match session {
                        Some(session) => session.refresh_conversations().await,
                        None => Ok(()),
                    }
                }
            });

        info!("Chat session started");
        result
    }

    /// Replaces the list filters and reloads page 1.
    ///
    /// The new-message baseline is reset so conversations that only appear
    /// because of the filter change do not notify.
    pub async fn set_filters(&self, filters: ConversationFilters) -> Result<(), ApiError> {
        {
            let mut state = self.inner.state.lock();
            state.filters = filters.with_page(1);
            state.conversations.clear();
            state.detector.reset();
        }

        let result = self.refresh_conversations().await;
        if let Err(e) = &result {
            self.report(Report::user_visible("load conversations", e.clone()));
        }
        result
    }

    /// One list tick: page 1 through the detector, then statistics.
    pub async fn refresh_conversations(&self) -> Result<(), ApiError> {
        let filters = self.inner.state.lock().filters.clone().with_page(1);
        let page = self.inner.api.list_conversations(&filters).await?;

        let events = {
            let mut state = self.inner.state.lock();
            if !state.filters.same_filters(&filters) {
                debug!("Discarding conversation page fetched with old filters");
                return Ok(());
            }
            let open = state.selected;
            let events = state.detector.observe(&page.items, open);
            state.conversations.reconcile_latest(page, Direction::Newer);
            events
        };

        for event in &events {
            self.inner.dispatcher.dispatch(event);
            self.emit(SessionEvent::NewMessage(event.conversation_id()));
        }
        self.emit(SessionEvent::ConversationsUpdated);

        self.refresh_statistics().await;
        Ok(())
    }

    async fn refresh_statistics(&self) {
        match self.inner.api.fetch_statistics().await {
            Ok(statistics) => {
                self.inner.state.lock().statistics = Some(statistics);
                self.emit(SessionEvent::StatisticsUpdated);
            }
            Err(e) => self.report(Report::silent("refresh statistics", e)),
        }
    }

    /// Fetches the next list page. Returns false when there is none.
    pub async fn load_more_conversations(&self) -> Result<bool, ApiError> {
        let (filters, next) = {
            let state = self.inner.state.lock();
            (state.filters.clone(), state.conversations.next_page())
        };
        let Some(next) = next else {
            return Ok(false);
        };

        match self
            .inner
            .api
            .list_conversations(&filters.clone().with_page(next))
            .await
        {
            Ok(page) => {
                {
                    let mut state = self.inner.state.lock();
                    if !state.filters.same_filters(&filters) {
                        return Ok(false);
                    }
                    state.conversations.apply(page, Direction::Newer);
                }
                self.emit(SessionEvent::ConversationsUpdated);
                Ok(true)
            }
            Err(e) => {
                self.report(Report::user_visible("load more conversations", e.clone()));
                Err(e)
            }
        }
    }

    /// Loads the next list page when `viewport` is scrolled close to the end.
    pub async fn load_more_if_near_bottom(
        &self,
        viewport: Viewport,
        threshold: u32,
        viewport_height: u32,
    ) -> Result<bool, ApiError> {
        if viewport.near_bottom(threshold, viewport_height) {
            self.load_more_conversations().await
        } else {
            Ok(false)
        }
    }

    /// Opens a conversation: marks it read once, loads its newest messages
    /// and starts polling it. Re-selecting the open conversation does not
    /// reload it.
    pub async fn select(&self, id: ConversationId) -> Result<(), ApiError> {
        let (generation, previous) = {
            let mut state = self.inner.state.lock();
            if state.selected == Some(id) {
                (None, None)
            } else {
                let previous = state.selected.replace(id);
                state.reset_selection();
                (Some(state.selection_generation), previous)
            }
        };

        let Some(generation) = generation else {
            if self.inner.read_state.on_select(id).await == MarkOutcome::Marked {
                self.apply_read(id);
            }
            return Ok(());
        };

        info!(conversation = %id, "Selected conversation");
        if let Some(previous) = previous {
            self.inner.scheduler.stop(PollKey::Conversation(previous));
        }
        self.inner
            .dispatcher
            .dismiss(&NotificationTag::for_conversation(id));
        self.schedule_conversation(id, generation);

        let limit = self.inner.settings.message_limit;
        let (mark, page) = tokio::join!(
            self.inner.read_state.on_select(id),
            self.inner.api.list_messages(id, 1, limit)
        );

        let result = match page {
            Ok(page) => {
                let mut state = self.inner.state.lock();
                if state.selection_generation == generation {
                    state.messages.apply(page, Direction::Older);
                } else {
                    debug!(conversation = %id, "Discarding messages for an old selection");
                }
                Ok(())
            }
            Err(e) => {
                self.report(Report::user_visible("load messages", e.clone()));
                Err(e)
            }
        };

        if mark == MarkOutcome::Marked {
            self.apply_read(id);
        }
        self.emit(SessionEvent::MessagesUpdated(id));
        result
    }

    fn schedule_conversation(&self, id: ConversationId, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.start(
            PollKey::Conversation(id),
            self.inner.settings.conversation_interval,
            move || {
                let session = Self::upgrade(&weak);
                async move {
                    match session {
                        Some(session) => session.poll_open_conversation(id, generation).await,
                        None => Ok(()),
                    }
                }
            },
        );
    }

    async fn poll_open_conversation(
        &self,
        id: ConversationId,
        generation: u64,
    ) -> Result<(), ApiError> {
        if self.inner.state.lock().selection_generation != generation {
            return Ok(());
        }

        let limit = self.inner.settings.message_limit;
        let page = self.inner.api.list_messages(id, 1, limit).await?;

        let outcome = {
            let mut state = self.inner.state.lock();
            if state.selection_generation != generation {
                return Ok(());
            }
            state.messages.reconcile_latest(page, Direction::Older)
        };

        if !matches!(outcome, MergeOutcome::Merged { added: 0, updated: 0 }) {
            self.emit(SessionEvent::MessagesUpdated(id));
        }
        Ok(())
    }

    /// Fetches the newest messages of the open conversation now.
    pub async fn refresh_messages(&self) -> Result<(), ApiError> {
        let selection = {
            let state = self.inner.state.lock();
            state.selected.map(|id| (id, state.selection_generation))
        };
        match selection {
            Some((id, generation)) => self.poll_open_conversation(id, generation).await,
            None => Ok(()),
        }
    }

    fn apply_read(&self, id: ConversationId) {
        {
            let mut state = self.inner.state.lock();
            if let Some(conversation) = state
                .conversations
                .items_mut()
                .iter_mut()
                .find(|c| c.conversation_id == id)
            {
                conversation.unread_count = 0;
            }
            if state.selected == Some(id) {
                state.messages.items_mut().iter_mut().for_each(Message::mark_read);
            }
        }
        self.emit(SessionEvent::UnreadChanged(id));
    }

    /// Closes the open conversation and stops polling it.
    pub fn deselect(&self) {
        let previous = {
            let mut state = self.inner.state.lock();
            let previous = state.selected.take();
            if previous.is_some() {
                state.reset_selection();
            }
            previous
        };

        if let Some(previous) = previous {
            self.inner.scheduler.stop(PollKey::Conversation(previous));
            self.inner.read_state.clear();
            debug!(conversation = %previous, "Deselected conversation");
        }
    }

    /// Fetches the next older history page. Returns false when there is none.
    pub async fn load_older_messages(&self) -> Result<bool, ApiError> {
        let target = {
            let state = self.inner.state.lock();
            state.selected.and_then(|id| {
                state
                    .messages
                    .next_page()
                    .map(|next| (id, state.selection_generation, next))
            })
        };
        let Some((id, generation, next)) = target else {
            return Ok(false);
        };

        let limit = self.inner.settings.message_limit;
        match self.inner.api.list_messages(id, next, limit).await {
            Ok(page) => {
                {
                    let mut state = self.inner.state.lock();
                    if state.selection_generation != generation {
                        return Ok(false);
                    }
                    state.messages.apply(page, Direction::Older);
                }
                self.emit(SessionEvent::MessagesUpdated(id));
                Ok(true)
            }
            Err(e) => {
                self.report(Report::user_visible("load older messages", e.clone()));
                Err(e)
            }
        }
    }

    /// Records the history scroll position.
    pub fn update_viewport(&self, viewport: Viewport) {
        self.inner.state.lock().viewport = viewport;
    }

    /// Loads older history when the stored viewport is close to the top.
    pub async fn load_older_if_near_top(&self, threshold: u32) -> Result<bool, ApiError> {
        let near_top = self.inner.state.lock().viewport.near_top(threshold);
        if near_top {
            self.load_older_messages().await
        } else {
            Ok(false)
        }
    }

    /// Shifts the stored viewport after a prepend so the same rows stay in
    /// view. Returns the adjusted viewport.
    pub fn anchor_scroll(&self, new_content_height: u32) -> Viewport {
        let mut state = self.inner.state.lock();
        state.viewport.anchor_after_prepend(new_content_height);
        state.viewport
    }

    pub fn set_composer_text(&self, text: impl Into<String>) {
        self.inner.state.lock().composer.text = text.into();
    }

    pub fn attach(&self, attachment: PendingAttachment) {
        self.inner.state.lock().composer.attachment = Some(attachment);
    }

    /// Marks the pending attachment uploaded.
    pub fn attachment_uploaded(&self, url: impl Into<String>) {
        self.inner.state.lock().composer.attachment = Some(PendingAttachment::uploaded(url));
    }

    /// Sends the composer to the open conversation.
    ///
    /// The confirmed message is appended and the composer cleared only after
    /// the server accepted it; on failure the composer is left as it was.
    pub async fn send(&self) -> Result<Message, SendError> {
        let (id, generation, composer) = {
            let state = self.inner.state.lock();
            let Some(id) = state.selected else {
                return Err(SendError::NoConversation);
            };
            (id, state.selection_generation, state.composer.clone())
        };

        match self.inner.sender.submit(id, &composer).await {
            Ok(message) => {
                {
                    let mut guard = self.inner.state.lock();
                    let state = &mut *guard;
                    if state.selection_generation == generation {
                        apply_confirmed(&mut state.messages, &mut state.composer, message.clone());
                    }
                }
                self.emit(SessionEvent::MessagesUpdated(id));
                Ok(message)
            }
            Err(e) => {
                match &e {
                    SendError::Api(error) => {
                        self.report(Report::user_visible("send message", error.clone()));
                    }
                    SendError::Invalid(reason) => {
                        self.report(Report::user_visible(
                            "send message",
                            ApiError::validation(*reason),
                        ));
                    }
                    SendError::InFlight | SendError::NoConversation => {
                        debug!(error = %e, "Send not attempted");
                    }
                }
                Err(e)
            }
        }
    }

    /// Handles a click on a toast or OS notification.
    pub async fn activate_notification(&self, tag: &NotificationTag) -> Result<(), ApiError> {
        match self.inner.dispatcher.activate(tag) {
            Some(id) => self.select(id).await,
            None => Ok(()),
        }
    }

    /// Asks for OS notification permission if it was never answered.
    pub async fn request_notification_permission(&self) -> PermissionState {
        self.inner.dispatcher.request_permission().await
    }

    #[must_use]
    pub fn toasts(&self) -> Arc<Mutex<NotificationManager>> {
        self.inner.toasts.clone()
    }

    #[must_use]
    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.inner.state.lock().conversations.items().to_vec()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().messages.items().to_vec()
    }

    #[must_use]
    pub fn statistics(&self) -> Option<ChatStatistics> {
        self.inner.state.lock().statistics.clone()
    }

    #[must_use]
    pub fn selected(&self) -> Option<ConversationId> {
        self.inner.state.lock().selected
    }

    #[must_use]
    pub fn composer(&self) -> Composer {
        self.inner.state.lock().composer.clone()
    }

    #[must_use]
    pub fn filters(&self) -> ConversationFilters {
        self.inner.state.lock().filters.clone()
    }

    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.inner.sender.is_sending()
    }

    #[must_use]
    pub fn scheduler(&self) -> &PollScheduler {
        &self.inner.scheduler
    }

    /// Stops every poll task and forgets the read-state selection.
    pub fn shutdown(&self) {
        self.inner.scheduler.stop_all();
        self.inner.read_state.clear();
        info!("Chat session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{LastMessage, MessageId, SenderRole};
    use crate::domain::ports::mocks::{MockChatApi, MockFocusPort, MockNotificationPort};
    use chrono::Utc;

    struct Fixture {
        session: ChatSession,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        api: Arc<MockChatApi>,
        os: Arc<MockNotificationPort>,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(MockChatApi::new());
        let os = Arc::new(MockNotificationPort::new(PermissionState::Granted));
        let focus = Arc::new(MockFocusPort::new(false));
        let (session, events) =
            ChatSession::new(api.clone(), os.clone(), focus, SessionSettings::default());
        Fixture {
            session,
            events,
            api,
            os,
        }
    }

    fn summary(id: u64, last: u64, role: SenderRole) -> ConversationSummary {
        ConversationSummary::new(ConversationId(id), Utc::now())
            .with_display_name(format!("Citizen {id}"))
            .with_unread_count(2)
            .with_last_message(LastMessage {
                id: MessageId(last),
                sender_role: role,
                text: "water logging on road 7".to_string(),
                created_at: Utc::now(),
            })
    }

    fn history(conversation: u64, count: u64) -> Vec<Message> {
        (1..=count)
            .map(|i| {
                Message::new(
                    MessageId(conversation * 1000 + i),
                    ConversationId(conversation),
                    7,
                    SenderRole::Remote,
                    format!("message {i}"),
                    Utc::now(),
                )
            })
            .collect()
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    const ONE: ConversationId = ConversationId(1);
    const TWO: ConversationId = ConversationId(2);

    #[tokio::test(start_paused = true)]
    async fn test_start_loads_list_and_statistics() {
        let f = fixture();
        f.api.set_conversations(vec![summary(1, 10, SenderRole::Remote)]);
        f.api.statistics.lock().unread_count = 4;

        tokio_test::assert_ok!(f.session.start(ConversationFilters::default()).await);

        assert_eq!(f.session.conversations().len(), 1);
        assert_eq!(f.session.statistics().map(|s| s.unread_count), Some(4));
        assert!(f.session.scheduler().is_active(PollKey::List));
        assert_eq!(f.os.shown_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_poll_notifies_new_remote_message() {
        let mut f = fixture();
        f.api.set_conversations(vec![
            summary(1, 10, SenderRole::Remote),
            summary(2, 20, SenderRole::Remote),
        ]);
        f.session
            .start(ConversationFilters::default())
            .await
            .unwrap();
        drain(&mut f.events);

        f.api.set_conversations(vec![
            summary(1, 11, SenderRole::Remote),
            summary(2, 20, SenderRole::Remote),
        ]);
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let events = drain(&mut f.events);
        assert!(events.contains(&SessionEvent::NewMessage(ONE)));
        assert!(!events.contains(&SessionEvent::NewMessage(TWO)));
        assert_eq!(f.os.shown_count(), 1);

        let toasts = f.session.toasts();
        let toasts = toasts.lock();
        assert_eq!(
            toasts.current_notification().unwrap().title,
            "New message from Citizen 1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_conversation_is_not_notified() {
        let mut f = fixture();
        f.api.set_conversations(vec![summary(1, 10, SenderRole::Remote)]);
        f.session
            .start(ConversationFilters::default())
            .await
            .unwrap();
        f.session.select(ONE).await.unwrap();
        drain(&mut f.events);

        f.api.set_conversations(vec![summary(1, 11, SenderRole::Remote)]);
        f.session.refresh_conversations().await.unwrap();

        assert!(!drain(&mut f.events).contains(&SessionEvent::NewMessage(ONE)));
        assert_eq!(f.os.shown_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_marks_once_and_polls() {
        let mut f = fixture();
        f.api.set_conversations(vec![summary(1, 10, SenderRole::Remote)]);
        f.api.set_messages(ONE, history(1, 3));
        f.session
            .start(ConversationFilters::default())
            .await
            .unwrap();

        f.session.select(ONE).await.unwrap();
        f.session.select(ONE).await.unwrap();

        assert_eq!(f.api.calls_to("mark_read:1"), 1);
        assert_eq!(f.api.calls_to("list_messages:1:1"), 1);
        assert_eq!(f.session.messages().len(), 3);
        assert!(f.session.messages().iter().all(Message::is_read));
        assert_eq!(f.session.conversations()[0].unread_count, 0);
        assert!(drain(&mut f.events).contains(&SessionEvent::UnreadChanged(ONE)));
        assert!(
            f.session
                .scheduler()
                .is_active(PollKey::Conversation(ONE))
        );
        assert_eq!(f.session.scheduler().active_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_conversations_replaces_poll() {
        let f = fixture();
        f.api.set_messages(ONE, history(1, 2));
        f.api.set_messages(TWO, history(2, 2));

        f.session.select(ONE).await.unwrap();
        f.session.select(TWO).await.unwrap();

        let scheduler = f.session.scheduler();
        assert!(!scheduler.is_active(PollKey::Conversation(ONE)));
        assert!(scheduler.is_active(PollKey::Conversation(TWO)));
        assert_eq!(scheduler.active_count(), 1);
        assert!(
            f.session
                .messages()
                .iter()
                .all(|m| m.conversation_id() == TWO)
        );

        f.session.deselect();
        assert_eq!(f.session.scheduler().active_count(), 0);
        assert!(f.session.messages().is_empty());
        assert_eq!(f.session.selected(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_selection_response_is_discarded() {
        let f = fixture();
        f.api.set_messages(ONE, history(1, 2));
        f.api.set_messages(TWO, history(2, 2));
        f.api.set_delay(Duration::from_secs(3));

        let slow = tokio::spawn({
            let session = f.session.clone();
            async move { session.select(ONE).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        *f.api.delay.lock() = None;

        f.session.select(TWO).await.unwrap();
        slow.await.unwrap().unwrap();

        assert_eq!(f.session.selected(), Some(TWO));
        assert!(
            f.session
                .messages()
                .iter()
                .all(|m| m.conversation_id() == TWO)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversation_poll_appends_new_messages() {
        let f = fixture();
        f.api.set_messages(ONE, history(1, 2));
        f.session.select(ONE).await.unwrap();

        f.api.set_messages(ONE, history(1, 3));
        tokio::time::sleep(Duration::from_millis(5_500)).await;

        assert_eq!(f.session.messages().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_announces_changed_known_messages() {
        let mut f = fixture();
        f.api.set_messages(ONE, history(1, 60));
        f.session.select(ONE).await.unwrap();
        f.session.load_older_messages().await.unwrap();
        drain(&mut f.events);

        let mut read = history(1, 60);
        read.iter_mut().for_each(Message::mark_read);
        f.api.set_messages(ONE, read);
        f.session.refresh_messages().await.unwrap();

        assert!(drain(&mut f.events).contains(&SessionEvent::MessagesUpdated(ONE)));
        assert!(f.session.messages().iter().skip(10).all(Message::is_read));
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_history_survives_poll() {
        let f = fixture();
        f.api.set_messages(ONE, history(1, 60));
        f.session.select(ONE).await.unwrap();
        assert_eq!(f.session.messages().len(), 50);

        f.session.update_viewport(Viewport::new(0, 2000));
        assert!(f.session.load_older_if_near_top(100).await.unwrap());
        assert_eq!(f.session.messages().len(), 60);
        assert_eq!(f.session.messages()[0].id(), MessageId(1001));
        assert_eq!(f.session.anchor_scroll(2400).offset, 400);

        f.session.refresh_messages().await.unwrap();
        assert_eq!(f.session.messages().len(), 60);
        assert!(!f.session.load_older_messages().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_appends_once_and_clears_composer() {
        let f = fixture();
        f.session.select(ONE).await.unwrap();
        f.session.set_composer_text("We have dispatched a team");

        let sent = f.session.send().await.unwrap();
        assert_eq!(f.session.messages().last().map(Message::id), Some(sent.id()));
        assert!(f.session.composer().is_empty());

        f.session.refresh_messages().await.unwrap();
        let copies = f
            .session
            .messages()
            .iter()
            .filter(|m| m.id() == sent.id())
            .count();
        assert_eq!(copies, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_keeps_composer() {
        let f = fixture();
        f.session.select(ONE).await.unwrap();
        f.session.set_composer_text("hello");
        f.api.fail_with(ApiError::from_status(500, "boom"));

        let err = f.session.send().await.unwrap_err();
        assert!(matches!(err, SendError::Api(_)));
        assert_eq!(f.session.composer(), Composer::new("hello"));
        assert!(f.session.messages().is_empty());

        let toasts = f.session.toasts();
        assert_eq!(
            toasts.lock().current_notification().unwrap().title,
            "Failed to send message"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_requires_selection() {
        let f = fixture();
        f.session.set_composer_text("hello");
        assert!(matches!(
            f.session.send().await,
            Err(SendError::NoConversation)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_poll_requests_login() {
        let mut f = fixture();
        f.session
            .start(ConversationFilters::default())
            .await
            .unwrap();
        drain(&mut f.events);

        f.api.fail_with(ApiError::from_status(401, "jwt expired"));
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        assert!(drain(&mut f.events).contains(&SessionEvent::LoginRequired));
        assert!(f.session.scheduler().is_active(PollKey::List));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_notification_opens_conversation() {
        let f = fixture();
        f.api.set_messages(TWO, history(2, 1));

        let tag = NotificationTag::for_conversation(TWO);
        f.session.activate_notification(&tag).await.unwrap();

        assert_eq!(f.session.selected(), Some(TWO));
        assert_eq!(f.session.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_resets_baseline() {
        let f = fixture();
        f.api.set_conversations(vec![summary(1, 10, SenderRole::Remote)]);
        f.session
            .start(ConversationFilters::default())
            .await
            .unwrap();

        f.api.set_conversations(vec![
            summary(1, 10, SenderRole::Remote),
            summary(3, 30, SenderRole::Remote),
        ]);
        f.session
            .set_filters(ConversationFilters::default().unread_only(true))
            .await
            .unwrap();

        assert_eq!(f.os.shown_count(), 0);
        assert!(f.session.filters().unread_only);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_more_conversations() {
        let f = fixture();
        f.api.set_conversations(
            (1..=25)
                .map(|i| summary(i, i * 10, SenderRole::Admin))
                .collect(),
        );
        f.session
            .start(ConversationFilters::default())
            .await
            .unwrap();
        assert_eq!(f.session.conversations().len(), 20);

        assert!(
            f.session
                .load_more_if_near_bottom(Viewport::new(900, 1000), 50, 100)
                .await
                .unwrap()
        );
        assert_eq!(f.session.conversations().len(), 25);
        assert!(!f.session.load_more_conversations().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let f = fixture();
        f.session
            .start(ConversationFilters::default())
            .await
            .unwrap();
        f.session.select(ONE).await.unwrap();

        f.session.shutdown();
        assert_eq!(f.session.scheduler().active_count(), 0);

        let before = f.api.calls_to("list_conversations");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(f.api.calls_to("list_conversations"), before);
    }
}
