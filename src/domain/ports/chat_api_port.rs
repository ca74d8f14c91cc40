//! Conversation server port.

use async_trait::async_trait;

use crate::domain::entities::{
    ChatStatistics, ConversationId, ConversationSummary, Message, OutgoingMessage, Page,
};
use crate::domain::errors::ApiError;

/// Default number of conversations per list page.
pub const DEFAULT_CONVERSATION_LIMIT: u32 = 20;
/// Default number of messages per history page.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 50;

/// Filters and paging for the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationFilters {
    pub search: Option<String>,
    pub unread_only: bool,
    pub zone_id: Option<u64>,
    pub ward_id: Option<u64>,
    pub city_corporation_code: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ConversationFilters {
    fn default() -> Self {
        Self {
            search: None,
            unread_only: false,
            zone_id: None,
            ward_id: None,
            city_corporation_code: None,
            page: 1,
            limit: DEFAULT_CONVERSATION_LIMIT,
        }
    }
}

impl ConversationFilters {
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    #[must_use]
    pub const fn unread_only(mut self, value: bool) -> Self {
        self.unread_only = value;
        self
    }

    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = if page == 0 { 1 } else { page };
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = if limit == 0 { 1 } else { limit };
        self
    }

    /// Same filters, ignoring the page number.
    #[must_use]
    pub fn same_filters(&self, other: &Self) -> bool {
        self.clone().with_page(1) == other.clone().with_page(1)
    }

    /// Query parameters sorted by name; unset filters are omitted.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("page", self.page.to_string()),
        ];
        if let Some(code) = &self.city_corporation_code {
            pairs.push(("cityCorporationCode", code.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if self.unread_only {
            pairs.push(("unreadOnly", "true".to_string()));
        }
        if let Some(ward) = self.ward_id {
            pairs.push(("wardId", ward.to_string()));
        }
        if let Some(zone) = self.zone_id {
            pairs.push(("zoneId", zone.to_string()));
        }
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
    }
}

/// Port for the conversation server.
#[async_trait]
pub trait ChatApiPort: Send + Sync {
    /// Fetches one page of conversation summaries.
    async fn list_conversations(
        &self,
        filters: &ConversationFilters,
    ) -> Result<Page<ConversationSummary>, ApiError>;

    /// Fetches one page of messages; page 1 holds the newest messages.
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: u32,
        limit: u32,
    ) -> Result<Page<Message>, ApiError>;

    /// Sends a message and returns the server-confirmed copy.
    async fn send_message(&self, message: &OutgoingMessage) -> Result<Message, ApiError>;

    /// Marks every message of a conversation as read.
    async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), ApiError>;

    /// Fetches aggregate counters.
    async fn fetch_statistics(&self) -> Result<ChatStatistics, ApiError>;
}

#[cfg(test)]
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use crate::domain::entities::{Pagination, SenderRole};
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// In-memory conversation server.
    pub struct MockChatApi {
        pub conversations: Mutex<Vec<ConversationSummary>>,
        pub messages: Mutex<HashMap<ConversationId, Vec<Message>>>,
        pub statistics: Mutex<ChatStatistics>,
        pub failure: Mutex<Option<ApiError>>,
        pub delay: Mutex<Option<Duration>>,
        calls: Mutex<Vec<String>>,
        next_id: AtomicU64,
    }

    impl Default for MockChatApi {
        fn default() -> Self {
            Self::new()
        }
    }

    fn paginate<T: Clone>(items: &[T], start: usize, end: usize, page: u32, limit: u32) -> Page<T> {
        let total = items.len() as u64;
        let total_pages = u32::try_from(items.len().div_ceil(limit as usize)).unwrap_or(u32::MAX);
        Page::new(
            items[start..end].to_vec(),
            Pagination {
                page,
                limit,
                total,
                total_pages,
                has_next: page < total_pages,
                has_prev: page > 1,
            },
        )
    }

    impl MockChatApi {
        pub fn new() -> Self {
            Self {
                conversations: Mutex::new(Vec::new()),
                messages: Mutex::new(HashMap::new()),
                statistics: Mutex::new(ChatStatistics::default()),
                failure: Mutex::new(None),
                delay: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1000),
            }
        }

        pub fn set_conversations(&self, conversations: Vec<ConversationSummary>) {
            *self.conversations.lock() = conversations;
        }

        /// Stores messages in chronological order.
        pub fn set_messages(&self, id: ConversationId, messages: Vec<Message>) {
            self.messages.lock().insert(id, messages);
        }

        pub fn fail_with(&self, error: ApiError) {
            *self.failure.lock() = Some(error);
        }

        pub fn clear_failure(&self) {
            *self.failure.lock() = None;
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        /// Number of recorded calls whose name starts with `prefix`.
        pub fn calls_to(&self, prefix: &str) -> usize {
            self.calls
                .lock()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        async fn enter(&self, call: String) -> Result<(), ApiError> {
            self.calls.lock().push(call);
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match self.failure.lock().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ChatApiPort for MockChatApi {
        async fn list_conversations(
            &self,
            filters: &ConversationFilters,
        ) -> Result<Page<ConversationSummary>, ApiError> {
            self.enter(format!("list_conversations:{}", filters.page))
                .await?;
            let items = self.conversations.lock().clone();
            let limit = filters.limit as usize;
            let start = ((filters.page as usize) - 1) * limit;
            let start = start.min(items.len());
            let end = (start + limit).min(items.len());
            Ok(paginate(&items, start, end, filters.page, filters.limit))
        }

        async fn list_messages(
            &self,
            conversation_id: ConversationId,
            page: u32,
            limit: u32,
        ) -> Result<Page<Message>, ApiError> {
            self.enter(format!("list_messages:{conversation_id}:{page}"))
                .await?;
            let items = self
                .messages
                .lock()
                .get(&conversation_id)
                .cloned()
                .unwrap_or_default();
            let skip = ((page as usize) - 1) * (limit as usize);
            let end = items.len().saturating_sub(skip);
            let start = end.saturating_sub(limit as usize);
            Ok(paginate(&items, start, end, page, limit))
        }

        async fn send_message(&self, message: &OutgoingMessage) -> Result<Message, ApiError> {
            self.enter(format!("send_message:{}", message.conversation_id))
                .await?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let mut confirmed = Message::new(
                id,
                message.conversation_id,
                1,
                SenderRole::Admin,
                message.text.clone(),
                Utc::now(),
            );
            if let Some(url) = &message.attachment_url {
                confirmed = confirmed.with_attachment(url.clone());
            }
            self.messages
                .lock()
                .entry(message.conversation_id)
                .or_default()
                .push(confirmed.clone());
            Ok(confirmed)
        }

        async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), ApiError> {
            self.enter(format!("mark_read:{conversation_id}")).await
        }

        async fn fetch_statistics(&self) -> Result<ChatStatistics, ApiError> {
            self.enter("fetch_statistics".to_string()).await?;
            Ok(self.statistics.lock().clone())
        }
    }
}
