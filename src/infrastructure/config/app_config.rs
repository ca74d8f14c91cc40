//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::SessionSettings;
use crate::application::services::notification_dispatcher::DispatcherSettings;
use crate::domain::ports::DEFAULT_MESSAGE_LIMIT;
use crate::infrastructure::cache::DEFAULT_CACHE_CAPACITY;

const APP_NAME: &str = "chat-sync";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "cleancare";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, from `config.toml` with CLI overrides.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Base URL of the admin chat API, e.g. `https://host/api/admin/chat`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Poll intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Open conversation refresh interval.
    #[serde(default = "default_conversation_interval")]
    pub conversation_interval_ms: u64,

    /// Conversation list and statistics refresh interval.
    #[serde(default = "default_list_interval")]
    pub list_interval_ms: u64,

    /// Messages fetched per history page.
    #[serde(default = "default_message_limit")]
    pub message_limit: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            conversation_interval_ms: default_conversation_interval(),
            list_interval_ms: default_list_interval(),
            message_limit: default_message_limit(),
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached response.
    #[serde(default = "default_cache_ttl")]
    pub ttl_ms: u64,

    /// Maximum number of cached responses.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Enable notifications globally.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Enable OS-level desktop notifications.
    #[serde(default = "default_true")]
    pub desktop: bool,

    /// How long a new-message toast stays visible.
    #[serde(default = "default_toast_duration")]
    pub toast_duration_secs: u64,

    /// Characters of message text shown in a preview.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            desktop: true,
            toast_duration_secs: default_toast_duration(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:4000/api/admin/chat".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_conversation_interval() -> u64 {
    5_000
}

fn default_list_interval() -> u64 {
    10_000
}

fn default_message_limit() -> u32 {
    DEFAULT_MESSAGE_LIMIT
}

fn default_cache_ttl() -> u64 {
    30_000
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_toast_duration() -> u64 {
    6
}

fn default_preview_chars() -> usize {
    50
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(url) = &args.api_base_url {
            self.api_base_url.clone_from(url);
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(ms) = args.conversation_interval_ms {
            self.polling.conversation_interval_ms = ms;
        }
        if let Some(ms) = args.list_interval_ms {
            self.polling.list_interval_ms = ms;
        }
        if let Some(ms) = args.cache_ttl_ms {
            self.cache.ttl_ms = ms;
        }
        if let Some(desktop) = args.desktop_notifications {
            self.notifications.desktop = desktop;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("chat-sync.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    /// Session timing derived from the configuration.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            conversation_interval: Duration::from_millis(self.polling.conversation_interval_ms),
            list_interval: Duration::from_millis(self.polling.list_interval_ms),
            message_limit: self.polling.message_limit.max(1),
            dispatcher: DispatcherSettings {
                toast_duration: Duration::from_secs(self.notifications.toast_duration_secs),
                preview_chars: self.notifications.preview_chars,
                desktop: self.notifications.enabled && self.notifications.desktop,
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            api_base_url: default_api_base_url(),
            log_path: None,
            log_level: LogLevel::Info,
            request_timeout_secs: default_request_timeout(),
            polling: PollingConfig::default(),
            cache: CacheConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}
