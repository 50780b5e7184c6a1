//! emote-bot: Twitch chat bot handing out time-limited 7TV emote slots.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use emote_pool::chat::TwitchChat;
use emote_pool::command::{DEFAULT_ALIAS_SENTINEL, DEFAULT_COMMAND_NAME};
use emote_pool::registry::DEFAULT_API_URL;
use emote_pool::transport::{ServerConfig, serve};
use emote_pool::{
    Bot, BotConfig, CommandHandler, EmoteCatalog, EmotePool, SevenTvConfig, SevenTvRegistry,
    TwitchConfig, VersionInfo,
};

#[derive(Parser, Debug)]
#[command(version, about = "Twitch chat bot handing out time-limited 7TV emote slots")]
struct Args {
    /// Twitch chat OAuth token
    #[arg(long, env = "TWITCH_TOKEN", hide_env_values = true)]
    twitch_token: String,

    /// Bot account login name
    #[arg(long, env = "BOT_NAME")]
    bot_name: String,

    /// Channel to join
    #[arg(long, env = "TARGET_CHANNEL")]
    channel: String,

    /// 7TV API token
    #[arg(long, env = "SEVEN_TV_TOKEN", hide_env_values = true)]
    seven_tv_token: String,

    /// 7TV emote set the slots are published into
    #[arg(long, env = "SEVEN_TV_SET_ID")]
    seven_tv_set_id: String,

    #[arg(long, env = "SEVEN_TV_API_URL", default_value = DEFAULT_API_URL)]
    seven_tv_api_url: String,

    /// Comma or whitespace separated emote ids
    #[arg(long, env = "EMOTE_IDS", conflicts_with = "emote_catalog")]
    emote_ids: Option<String>,

    /// File with one emote id per line (`#` starts a comment)
    #[arg(long, env = "EMOTE_CATALOG")]
    emote_catalog: Option<PathBuf>,

    /// Seconds an activated emote stays live
    #[arg(long, env = "EMOTE_TTL_SECS", default_value_t = 20)]
    ttl_secs: u64,

    #[arg(long, env = "REGISTRY_TIMEOUT_SECS", default_value_t = 10)]
    registry_timeout_secs: u64,

    #[arg(long, env = "COMMAND_NAME", default_value = DEFAULT_COMMAND_NAME)]
    command_name: String,

    #[arg(long, env = "COMMAND_PREFIX", default_value = "!")]
    command_prefix: String,

    /// Argument meaning "use my name as the alias"
    #[arg(long, env = "ALIAS_SENTINEL", default_value = DEFAULT_ALIAS_SENTINEL)]
    alias_sentinel: String,

    /// Serve /health-check and /shutdown on this address
    #[arg(long, env = "STATUS_ADDR")]
    status_addr: Option<SocketAddr>,
}

impl Args {
    fn catalog(&self) -> anyhow::Result<EmoteCatalog> {
        let catalog = match (&self.emote_ids, &self.emote_catalog) {
            (Some(list), _) => EmoteCatalog::parse_list(list)?,
            (None, Some(path)) => EmoteCatalog::from_file(path)?,
            (None, None) => anyhow::bail!("one of EMOTE_IDS or EMOTE_CATALOG is required"),
        };
        Ok(catalog)
    }
}

/// Initialize tracing with EMOTE_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let base_level = match std::env::var("EMOTE_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };

        EnvFilter::new(format!(
            "emote_pool={level},emote_bot={level}",
            level = base_level
        ))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = shutdown.cancelled() => {
            return;
        }
    }

    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let catalog = args.catalog()?;
    info!(emotes = catalog.len(), "Loaded emote catalog");

    let timeout = Duration::from_secs(args.registry_timeout_secs);
    let registry = SevenTvRegistry::new(
        SevenTvConfig::new(args.seven_tv_token.clone(), args.seven_tv_set_id.clone())
            .with_api_url(args.seven_tv_api_url.clone())
            .with_timeout(timeout),
    )
    .context("failed to build 7TV client")?;

    let pool = Arc::new(EmotePool::new(catalog, Arc::new(registry)).with_call_timeout(timeout));

    let ttl = Duration::from_secs(args.ttl_secs);
    let handler = CommandHandler::new(Arc::clone(&pool), ttl)
        .with_name(args.command_name.clone())
        .with_sentinel(args.alias_sentinel.clone());

    let config = BotConfig {
        ttl,
        ..BotConfig::new(args.channel.clone())
    };
    let bot = Arc::new(
        Bot::new(pool, handler, config)
            .with_version(VersionInfo::new().with_bot(args.bot_name.clone())),
    );

    tokio::spawn(shutdown_signal(bot.shutdown_token()));

    let status = args.status_addr.map(|addr| {
        let bot = Arc::clone(&bot);
        tokio::spawn(async move {
            if let Err(e) = serve(ServerConfig::from_addr(addr), bot).await {
                tracing::error!(error = %e, "Status server failed");
            }
        })
    });

    let chat_config = TwitchConfig {
        command_prefix: args.command_prefix.clone(),
        ..TwitchConfig::new(args.twitch_token.clone(), args.bot_name.clone())
    };
    let result = match TwitchChat::connect(chat_config).await {
        Ok(chat) => bot.run(chat).await.context("chat connection failed"),
        Err(e) => Err(anyhow::Error::new(e).context("failed to connect to Twitch chat")),
    };

    // Stops the status server and the signal task
    bot.trigger_shutdown();
    if let Some(status) = status {
        let _ = status.await;
    }

    info!("emote-bot stopped");
    result
}
