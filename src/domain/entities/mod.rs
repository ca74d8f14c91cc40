//! Domain entity definitions.

mod conversation;
mod message;
mod page;
mod statistics;
mod token;

pub use conversation::{ConversationId, ConversationSummary, LastMessage};
pub use message::{Message, MessageId, OutgoingMessage, SenderRole};
pub use page::{Page, Pagination};
pub use statistics::ChatStatistics;
pub use token::AuthToken;
