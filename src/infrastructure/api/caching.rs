//! Cache-aware decorator over a [`ChatApiPort`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::domain::entities::{
    ChatStatistics, ConversationId, ConversationSummary, Message, OutgoingMessage, Page,
};
use crate::domain::errors::ApiError;
use crate::domain::ports::{ChatApiPort, ConversationFilters};
use crate::infrastructure::cache::TtlCache;

/// Default lifetime of a cached read.
pub const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(30);

const STATISTICS_KEY: &str = "statistics";

/// A cached read response.
#[derive(Debug, Clone)]
pub enum CachedResponse {
    Conversations(Page<ConversationSummary>),
    Messages(Page<Message>),
    Statistics(ChatStatistics),
}

fn list_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^conversations").expect("Invalid regex"))
}

fn statistics_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^statistics").expect("Invalid regex"))
}

/// Serves reads from a shared [`TtlCache`] and evicts stale keys after writes.
pub struct CachingChatApi {
    inner: Arc<dyn ChatApiPort>,
    cache: Arc<TtlCache<CachedResponse>>,
    ttl: Duration,
}

impl CachingChatApi {
    #[must_use]
    pub fn new(
        inner: Arc<dyn ChatApiPort>,
        cache: Arc<TtlCache<CachedResponse>>,
        ttl: Duration,
    ) -> Self {
        Self { inner, cache, ttl }
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<TtlCache<CachedResponse>> {
        &self.cache
    }

    /// Cache key for a conversation list request.
    #[must_use]
    pub fn conversations_key(filters: &ConversationFilters) -> String {
        let query = filters
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("conversations?{query}")
    }

    /// Cache key for a message page request.
    #[must_use]
    pub fn messages_key(conversation_id: ConversationId, page: u32, limit: u32) -> String {
        format!("conversation-{conversation_id}-messages?page={page}&limit={limit}")
    }

    /// Evicts everything a write to `conversation_id` can make stale.
    pub fn invalidate_conversation(&self, conversation_id: ConversationId) {
        match Regex::new(&format!("^conversation-{conversation_id}-")) {
            Ok(pattern) => {
                self.cache.invalidate_pattern(&pattern);
            }
            Err(e) => warn!(error = %e, %conversation_id, "Failed to build invalidation pattern"),
        }
        self.cache.invalidate_pattern(list_pattern());
        self.cache.invalidate_pattern(statistics_pattern());
        debug!(%conversation_id, "Invalidated cached reads after write");
    }
}

#[async_trait]
impl ChatApiPort for CachingChatApi {
    async fn list_conversations(
        &self,
        filters: &ConversationFilters,
    ) -> Result<Page<ConversationSummary>, ApiError> {
        let key = Self::conversations_key(filters);
        if let Some(CachedResponse::Conversations(page)) = self.cache.get(&key) {
            trace!(key, "Serving conversations from cache");
            return Ok(page);
        }

        let page = self.inner.list_conversations(filters).await?;
        self.cache
            .set(key, CachedResponse::Conversations(page.clone()), self.ttl);
        Ok(page)
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: u32,
        limit: u32,
    ) -> Result<Page<Message>, ApiError> {
        let key = Self::messages_key(conversation_id, page, limit);
        if let Some(CachedResponse::Messages(cached)) = self.cache.get(&key) {
            trace!(key, "Serving messages from cache");
            return Ok(cached);
        }

        let fetched = self
            .inner
            .list_messages(conversation_id, page, limit)
            .await?;
        self.cache
            .set(key, CachedResponse::Messages(fetched.clone()), self.ttl);
        Ok(fetched)
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<Message, ApiError> {
        let confirmed = self.inner.send_message(message).await?;
        self.invalidate_conversation(message.conversation_id);
        Ok(confirmed)
    }

    async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), ApiError> {
        self.inner.mark_read(conversation_id).await?;
        self.invalidate_conversation(conversation_id);
        Ok(())
    }

    async fn fetch_statistics(&self) -> Result<ChatStatistics, ApiError> {
        if let Some(CachedResponse::Statistics(stats)) = self.cache.get(STATISTICS_KEY) {
            return Ok(stats);
        }

        let stats = self.inner.fetch_statistics().await?;
        self.cache.set(
            STATISTICS_KEY,
            CachedResponse::Statistics(stats.clone()),
            self.ttl,
        );
        Ok(stats)
    }
}
