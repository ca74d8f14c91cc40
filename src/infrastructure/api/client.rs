//! Conversation server HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::dto::{
    self, ConversationDto, ErrorResponse, MarkReadDto, MessageDto, PageDto, SendMessageBody,
    SentMessageDto, StatisticsDto,
};
use crate::domain::entities::{
    AuthToken, ChatStatistics, ConversationId, ConversationSummary, Message, OutgoingMessage, Page,
};
use crate::domain::errors::ApiError;
use crate::domain::ports::{ChatApiPort, ConversationFilters};

const USER_AGENT: &str = concat!("chat-sync/", env!("CARGO_PKG_VERSION"));

/// Resolves a media URL from the server against the API base.
///
/// Absolute URLs are returned unchanged, root-relative paths are joined
/// to the server origin.
#[must_use]
pub fn resolve_media_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok().map(String::from)
}

/// Typed client for the conversation endpoints.
pub struct HttpChatApi {
    client: Client,
    base_url: String,
    media_base: Url,
    token: AuthToken,
}

impl HttpChatApi {
    /// Creates a client for `base_url` authenticating with `token`.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: AuthToken,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let media_base = Url::parse(&format!("{base_url}/"))
            .map_err(|e| ApiError::unknown(format!("invalid API base URL {base_url}: {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::unknown(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            media_base,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, ApiError> {
        let response = request
            .header(header::AUTHORIZATION, self.token.bearer())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, operation, "Request to conversation server failed");
                transport_error(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, response, operation).await);
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(error = %e, operation, "Failed to read response body");
            transport_error(&e)
        })?;

        dto::decode(&body).inspect_err(|e| {
            warn!(error = %e, operation, "Failed to parse response");
        })
    }

    async fn handle_error_response(
        status: StatusCode,
        response: reqwest::Response,
        operation: &'static str,
    ) -> ApiError {
        let error_message = match response.json::<ErrorResponse>().await {
            Ok(error) => error.message,
            Err(_) => format!("HTTP {status}"),
        };

        if status == StatusCode::UNAUTHORIZED {
            warn!(operation, "Server rejected the bearer token");
        } else {
            debug!(operation, %status, message = %error_message, "Server returned an error");
        }

        ApiError::from_status(status.as_u16(), error_message)
    }
}

fn transport_error(e: &reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::network("request timed out")
    } else if e.is_connect() {
        ApiError::network("failed to connect to the conversation server")
    } else if e.is_decode() {
        ApiError::malformed(e.to_string())
    } else {
        ApiError::network(e.to_string())
    }
}

#[async_trait]
impl ChatApiPort for HttpChatApi {
    async fn list_conversations(
        &self,
        filters: &ConversationFilters,
    ) -> Result<Page<ConversationSummary>, ApiError> {
        debug!(page = filters.page, "Fetching conversations");
        let request = self
            .client
            .get(self.url("conversations"))
            .query(&filters.query_pairs());
        let page: PageDto<ConversationDto> = self.execute(request, "list conversations").await?;
        Ok(dto::conversation_page(page))
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: u32,
        limit: u32,
    ) -> Result<Page<Message>, ApiError> {
        debug!(%conversation_id, page, "Fetching messages");
        let request = self
            .client
            .get(self.url(&format!("conversations/{conversation_id}/messages")))
            .query(&[("page", page), ("limit", limit)]);
        let dto: PageDto<MessageDto> = self.execute(request, "list messages").await?;
        dto::message_page(dto, conversation_id, &self.media_base)
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<Message, ApiError> {
        debug!(
            conversation_id = %message.conversation_id,
            client_ref = %message.client_ref,
            "Sending message"
        );
        let body = SendMessageBody {
            text: &message.text,
            attachment_url: message.attachment_url.as_deref(),
        };
        let request = self
            .client
            .post(self.url(&format!(
                "conversations/{}/messages",
                message.conversation_id
            )))
            .json(&body);
        let sent: SentMessageDto = self.execute(request, "send message").await?;

        if sent.message.conversation_id != message.conversation_id.as_u64() {
            return Err(ApiError::malformed(format!(
                "confirmed message belongs to conversation {}",
                sent.message.conversation_id
            )));
        }
        Ok(sent.message.into_message(&self.media_base))
    }

    async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), ApiError> {
        debug!(%conversation_id, "Marking conversation as read");
        let request = self
            .client
            .patch(self.url(&format!("conversations/{conversation_id}/read")));
        let ack: MarkReadDto = self.execute(request, "mark read").await?;
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::unknown("server refused to mark messages as read"))
        }
    }

    async fn fetch_statistics(&self) -> Result<ChatStatistics, ApiError> {
        let request = self.client.get(self.url("statistics"));
        let stats: StatisticsDto = self.execute(request, "fetch statistics").await?;
        Ok(stats.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;

    fn token() -> AuthToken {
        AuthToken::new_unchecked("test-token")
    }

    #[test]
    fn test_client_creation() {
        let client = HttpChatApi::new(
            "https://api.example.org/api/admin/live-chat/",
            token(),
            Duration::from_secs(30),
        );
        let client = client.unwrap();
        assert_eq!(
            client.url("statistics"),
            "https://api.example.org/api/admin/live-chat/statistics"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpChatApi::new("not a url", token(), Duration::from_secs(1))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_resolve_media_url() {
        let base = Url::parse("https://api.example.org/api/admin/").unwrap();

        assert_eq!(
            resolve_media_url(&base, "/uploads/v.ogg").as_deref(),
            Some("https://api.example.org/uploads/v.ogg")
        );
        assert_eq!(
            resolve_media_url(&base, "https://res.cloudinary.com/x/upload/a.jpg").as_deref(),
            Some("https://res.cloudinary.com/x/upload/a.jpg")
        );
        assert_eq!(resolve_media_url(&base, "  "), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client =
            HttpChatApi::new("http://127.0.0.1:9", token(), Duration::from_secs(2)).unwrap();

        let err = client.fetch_statistics().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
    }
}
