use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "chat-sync",
    version,
    about = "Keeps an operator console in sync with the complaint chat server",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Bearer token; falls back to the system keyring.
    #[arg(long, env = "CHAT_SYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Save the given token to the system keyring.
    #[arg(long, requires = "token")]
    pub save_token: bool,

    /// Remove the stored token from the system keyring and exit.
    #[arg(long, conflicts_with = "token")]
    pub logout: bool,

    /// Base URL of the admin chat API.
    #[arg(long, value_name = "URL", env = "CHAT_SYNC_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Open this conversation after start-up.
    #[arg(long, value_name = "ID")]
    pub open: Option<u64>,

    /// Only list conversations matching this text.
    #[arg(long)]
    pub search: Option<String>,

    /// Only list conversations with unread messages.
    #[arg(long)]
    pub unread_only: bool,

    /// Open conversation refresh interval.
    #[arg(long, value_name = "MS")]
    pub conversation_interval_ms: Option<u64>,

    /// Conversation list refresh interval.
    #[arg(long, value_name = "MS")]
    pub list_interval_ms: Option<u64>,

    /// Response cache lifetime.
    #[arg(long, value_name = "MS")]
    pub cache_ttl_ms: Option<u64>,

    /// Enable desktop notifications.
    #[arg(long)]
    pub desktop_notifications: Option<bool>,
}
