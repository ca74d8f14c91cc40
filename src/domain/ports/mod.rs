mod chat_api_port;
mod notification_port;
mod token_storage_port;

pub use chat_api_port::{
    ChatApiPort, ConversationFilters, DEFAULT_CONVERSATION_LIMIT, DEFAULT_MESSAGE_LIMIT,
};
pub use notification_port::{FocusPort, NotificationPort};
pub use token_storage_port::TokenStoragePort;

#[cfg(test)]
pub mod mocks {
    pub use super::chat_api_port::mock::MockChatApi;
    pub use super::notification_port::mock::{MockFocusPort, MockNotificationPort};
    pub use super::token_storage_port::mock::MockTokenStorage;
}
