//! Infrastructure layer with external service adapters.

/// HTTP client and caching decorator for the conversation server.
pub mod api;
/// Response cache.
pub mod cache;
/// Application configuration.
pub mod config;
/// Desktop notifications and focus tracking.
pub mod notifications;
/// Token storage adapters.
pub mod storage;

pub use api::{CachedResponse, CachingChatApi, HttpChatApi};
pub use cache::{CacheStats, TtlCache};
pub use config::{AppConfig, CliArgs, ConfigError, LogLevel, StorageManager};
pub use notifications::{DesktopNotificationService, TerminalFocus};
pub use storage::KeyringTokenStorage;
