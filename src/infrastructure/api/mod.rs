//! Conversation server adapters.

mod caching;
mod client;
mod dto;

pub use caching::{CachedResponse, CachingChatApi, DEFAULT_RESPONSE_TTL};
pub use client::{HttpChatApi, resolve_media_url};
