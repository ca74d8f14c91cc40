use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chat_sync::application::{ChatSession, ResolveTokenUseCase, SessionEvent};
use chat_sync::domain::{AuthToken, ConversationId, NotificationTag};
use chat_sync::domain::ports::{ChatApiPort, ConversationFilters};
use chat_sync::infrastructure::{
    AppConfig, CachingChatApi, CliArgs, DesktopNotificationService, HttpChatApi,
    KeyringTokenStorage, StorageManager, TerminalFocus, TtlCache,
};

const TOAST_REFRESH: Duration = Duration::from_millis(250);

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage
        .load_config(args.config.as_deref())
        .wrap_err("failed to load configuration")?;
    config.merge_with_args(args);
    Ok(config)
}

fn build_api(config: &AppConfig, token: AuthToken) -> Result<Arc<dyn ChatApiPort>> {
    let http = HttpChatApi::new(config.api_base_url.clone(), token, config.request_timeout())?;
    let cache = Arc::new(TtlCache::new(config.cache.capacity));
    Ok(Arc::new(CachingChatApi::new(
        Arc::new(http),
        cache,
        config.cache_ttl(),
    )))
}

fn print_toasts(session: &ChatSession) {
    let toasts = session.toasts();
    let mut toasts = toasts.lock();
    for toast in toasts.take_undisplayed() {
        let retry = if toast.retryable { " (retry)" } else { "" };
        println!("[{:?}] {}: {}{retry}", toast.level, toast.title, toast.message);
    }
    toasts.purge_expired();
}

async fn run(
    session: &ChatSession,
    mut events: UnboundedReceiver<SessionEvent>,
    mut activations: UnboundedReceiver<NotificationTag>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(TOAST_REFRESH);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                return Ok(());
            }
            event = events.recv() => match event {
                Some(SessionEvent::LoginRequired) => {
                    print_toasts(session);
                    return Err(eyre!(
                        "the server rejected the token; log in again and restart with --token"
                    ));
                }
                Some(SessionEvent::NewMessage(id)) => info!(conversation = %id, "New message"),
                Some(SessionEvent::UnreadChanged(id)) => {
                    info!(conversation = %id, "Unread counters changed");
                }
                Some(SessionEvent::StatisticsUpdated) => {
                    if let Some(stats) = session.statistics() {
                        info!(unread = stats.unread_count, today = stats.today_messages, "Statistics");
                    }
                }
                Some(_) => {}
                None => return Ok(()),
            },
            Some(tag) = activations.recv() => {
                if let Err(e) = session.activate_notification(&tag).await {
                    warn!(%tag, error = %e, "Could not open notified conversation");
                }
            }
            _ = ticker.tick() => print_toasts(session),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = chat_sync::VERSION, "Starting {}", chat_sync::NAME);

    let tokens = ResolveTokenUseCase::new(Arc::new(KeyringTokenStorage::new()));
    if args.logout {
        tokens.forget().await?;
        println!("Stored token removed.");
        return Ok(());
    }

    let resolved = tokens
        .execute(args.token.clone(), args.save_token)
        .await?
        .ok_or_else(|| eyre!("no token available; pass --token or set CHAT_SYNC_TOKEN"))?;
    info!(source = %resolved.source, token = %resolved.token, "Token resolved");

    let api = build_api(&config, resolved.token)?;
    let notifications = Arc::new(DesktopNotificationService::new(
        config.notifications.enabled && config.notifications.desktop,
    ));
    let activations = notifications.subscribe_activations();
    let focus = Arc::new(TerminalFocus::default());
    let (session, events) =
        ChatSession::new(api, notifications, focus, config.session_settings());

    let permission = session.request_notification_permission().await;
    info!(?permission, "Desktop notifications");

    let mut filters = ConversationFilters::default().unread_only(args.unread_only);
    if let Some(search) = &args.search {
        filters = filters.with_search(search.clone());
    }
    if let Err(e) = session.start(filters).await {
        warn!(error = %e, "Initial conversation load failed; polling continues");
    }
    if let Some(id) = args.open
        && let Err(e) = session.select(ConversationId(id)).await
    {
        warn!(conversation = id, error = %e, "Could not open conversation");
    }

    let result = run(&session, events, activations).await;
    session.shutdown();
    print_toasts(&session);
    result
}
