//! Wire schemas for the conversation server.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::resolve_media_url;
use crate::domain::entities::{
    ChatStatistics, ConversationId, ConversationSummary, LastMessage, Message, Page, Pagination,
    SenderRole,
};
use crate::domain::errors::ApiError;

/// Decodes a response body, unwrapping a `{ success, data }` envelope when present.
///
/// An envelope with `success: false` is an error carrying the server's
/// `message`. One without `data`, or with `data: null`, decodes as the bare
/// object.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::malformed(e.to_string()))?;

    let payload = match value {
        Value::Object(mut map) if map.get("success").is_some_and(Value::is_boolean) => {
            if map.get("success") == Some(&Value::Bool(false)) {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("server reported a failure");
                return Err(ApiError::unknown(message));
            }
            match map.remove("data") {
                Some(Value::Null) | None => Value::Object(map),
                Some(data) => data,
            }
        }
        other => other,
    };

    serde_json::from_value(payload).map_err(|e| ApiError::malformed(e.to_string()))
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// Human readable message from the server.
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub page: u32,
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

impl From<PaginationDto> for Pagination {
    fn from(dto: PaginationDto) -> Self {
        Self {
            page: dto.page,
            limit: dto.limit,
            total: dto.total,
            total_pages: dto.total_pages,
            has_next: dto.has_next,
            has_prev: dto.has_prev,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageDto<T> {
    pub items: Vec<T>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageDto {
    pub id: u64,
    pub sender_role: SenderRole,
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub conversation_id: u64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub last_message: Option<LastMessageDto>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub is_new: bool,
    pub last_activity: DateTime<Utc>,
}

impl From<ConversationDto> for ConversationSummary {
    fn from(dto: ConversationDto) -> Self {
        Self {
            conversation_id: ConversationId(dto.conversation_id),
            display_name: dto.display_name,
            phone: dto.phone,
            last_message: dto.last_message.map(|m| LastMessage {
                id: m.id.into(),
                sender_role: m.sender_role,
                text: m.text,
                created_at: m.created_at,
            }),
            unread_count: dto.unread_count,
            is_new: dto.is_new,
            last_activity: dto.last_activity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: u64,
    pub conversation_id: u64,
    pub sender_id: u64,
    pub sender_role: SenderRole,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub voice_url: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageDto {
    /// Converts to a domain message, resolving relative media URLs.
    pub fn into_message(self, media_base: &Url) -> Message {
        let mut message = Message::new(
            self.id,
            ConversationId(self.conversation_id),
            self.sender_id,
            self.sender_role,
            self.text,
            self.created_at,
        )
        .with_read(self.read);

        if let Some(url) = self
            .attachment_url
            .as_deref()
            .and_then(|u| resolve_media_url(media_base, u))
        {
            message = message.with_attachment(url);
        }
        if let Some(url) = self
            .voice_url
            .as_deref()
            .and_then(|u| resolve_media_url(media_base, u))
        {
            message = message.with_voice(url);
        }
        message
    }
}

#[derive(Debug, Deserialize)]
pub struct SentMessageDto {
    pub message: MessageDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadDto {
    #[serde(default = "default_true")]
    pub success: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsDto {
    pub total_conversations: u64,
    pub unread_count: u64,
    #[serde(default)]
    pub today_messages: u64,
    #[serde(default)]
    pub breakdowns: BTreeMap<String, u64>,
}

impl From<StatisticsDto> for ChatStatistics {
    fn from(dto: StatisticsDto) -> Self {
        Self {
            total_conversations: dto.total_conversations,
            unread_count: dto.unread_count,
            today_messages: dto.today_messages,
            breakdowns: dto.breakdowns,
        }
    }
}

/// Converts a conversation page.
pub fn conversation_page(dto: PageDto<ConversationDto>) -> Page<ConversationSummary> {
    Page::new(
        dto.items.into_iter().map(ConversationSummary::from).collect(),
        dto.pagination.into(),
    )
}

/// Converts a message page, rejecting messages from another conversation.
pub fn message_page(
    dto: PageDto<MessageDto>,
    conversation_id: ConversationId,
    media_base: &Url,
) -> Result<Page<Message>, ApiError> {
    if let Some(stray) = dto
        .items
        .iter()
        .find(|m| m.conversation_id != conversation_id.as_u64())
    {
        return Err(ApiError::malformed(format!(
            "message {} belongs to conversation {}, expected {conversation_id}",
            stray.id, stray.conversation_id
        )));
    }

    Ok(Page::new(
        dto.items
            .into_iter()
            .map(|m| m.into_message(media_base))
            .collect(),
        dto.pagination.into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;

    fn base() -> Url {
        Url::parse("https://api.example.org/api/admin/").unwrap()
    }

    #[test]
    fn test_decode_wrapped_envelope() {
        let body = br#"{"success":true,"data":{"totalConversations":4,"unreadCount":2}}"#;
        let stats: StatisticsDto = decode(body).unwrap();
        assert_eq!(stats.total_conversations, 4);
        assert_eq!(stats.unread_count, 2);
        assert_eq!(stats.today_messages, 0);
    }

    #[test]
    fn test_decode_failed_envelope_is_error() {
        let body = br#"{"success":false,"message":"Conversation is closed","data":{"totalConversations":4,"unreadCount":2}}"#;
        let err = decode::<StatisticsDto>(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.message(), "Conversation is closed");
    }

    #[test]
    fn test_decode_envelope_with_null_data() {
        let ack: MarkReadDto = decode(br#"{"success":true,"data":null}"#).unwrap();
        assert!(ack.success);

        let ack: MarkReadDto = decode(br#"{"success":true,"message":"ok"}"#).unwrap();
        assert!(ack.success);
    }

    #[test]
    fn test_decode_bare_payload() {
        let body = br#"{"totalConversations":1,"unreadCount":0,"breakdowns":{"zone-1":3}}"#;
        let stats: ChatStatistics = decode::<StatisticsDto>(body).unwrap().into();
        assert_eq!(stats.breakdowns.get("zone-1"), Some(&3));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let body = br#"{"items":[{"conversationId":1}],"pagination":{"page":1,"limit":20}}"#;
        let err = decode::<PageDto<ConversationDto>>(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.message().starts_with("malformed response"));
    }

    #[test]
    fn test_conversation_page_conversion() {
        let body = br#"{
            "items": [{
                "conversationId": 9,
                "displayName": "Karim",
                "lastMessage": {"id": 11, "senderRole": "REMOTE", "text": "hello", "createdAt": "2026-01-02T03:04:05Z"},
                "unreadCount": 3,
                "lastActivity": "2026-01-02T03:04:05Z"
            }],
            "pagination": {"page": 1, "limit": 20, "total": 1, "totalPages": 1, "hasNext": false, "hasPrev": false}
        }"#;
        let page = conversation_page(decode(body).unwrap());

        assert_eq!(page.items.len(), 1);
        let summary = &page.items[0];
        assert_eq!(summary.conversation_id, ConversationId(9));
        assert_eq!(summary.unread_count, 3);
        assert_eq!(summary.last_message_id(), Some(11.into()));
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[test]
    fn test_message_page_resolves_media_and_rejects_strays() {
        let body = br#"{
            "items": [{
                "id": 1, "conversationId": 5, "senderId": 2, "senderRole": "ADMIN",
                "text": "see photo", "attachmentUrl": "/uploads/a.jpg",
                "createdAt": "2026-01-02T03:04:05Z"
            }],
            "pagination": {"page": 1, "limit": 50}
        }"#;
        let page = message_page(decode(body).unwrap(), ConversationId(5), &base()).unwrap();
        assert_eq!(
            page.items[0].attachment_url(),
            Some("https://api.example.org/uploads/a.jpg")
        );

        let err = message_page(decode(body).unwrap(), ConversationId(6), &base()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_send_body_omits_missing_attachment() {
        let body = SendMessageBody {
            text: "hi",
            attachment_url: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"text":"hi"}"#);
    }
}
