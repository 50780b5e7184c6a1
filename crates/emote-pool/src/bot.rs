//! Bot: wires chat, command handling, the pool and the expiry scheduler.
//!
//! The bot owns the shutdown sequence:
//! 1. stop reading chat and wait for in-flight commands
//! 2. stop the expiry scheduler
//! 3. release every still-active emote
//! 4. close the chat connection
//!
//! Shutdown is requested through the cancellation token (signal handler,
//! status endpoint) or happens when the chat connection ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatConnection, ChatError, ChatEvent};
use crate::command::CommandHandler;
use crate::expiry::{DEFAULT_TTL, ExpiryScheduler};
use crate::health::Health;
use crate::pool::{ActiveEmote, EmotePool};
use crate::version::VersionInfo;

/// Snapshot of bot health for transports to query.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub state: Health,
    pub available_slots: usize,
    pub total_slots: usize,
    pub active: Vec<ActiveEmote>,
    pub version: VersionInfo,
}

impl HealthSnapshot {
    /// BUSY: ready but every slot is taken.
    pub fn is_busy(&self) -> bool {
        self.state == Health::Ready && self.available_slots == 0
    }
}

/// Bot settings that are not owned by the pool or the command handler.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Channel joined once chat is ready.
    pub channel: String,
    /// How long an activated emote stays live.
    pub ttl: Duration,
    /// Expiry scan period; defaults to the TTL.
    pub expiry_period: Option<Duration>,
}

impl BotConfig {
    pub fn new(channel: String) -> Self {
        Self {
            channel,
            ttl: DEFAULT_TTL,
            expiry_period: None,
        }
    }
}

pub struct Bot {
    pool: Arc<EmotePool>,
    handler: Arc<CommandHandler>,
    config: BotConfig,
    health: RwLock<Health>,
    shutdown: CancellationToken,
    version: VersionInfo,
}

/// Outcome of one pass of the event loop.
enum Step {
    Shutdown,
    Event(Result<Option<ChatEvent>, ChatError>),
    CommandDone(Result<(), tokio::task::JoinError>),
}

impl Bot {
    pub fn new(pool: Arc<EmotePool>, handler: CommandHandler, config: BotConfig) -> Self {
        Self {
            pool,
            handler: Arc::new(handler),
            config,
            health: RwLock::new(Health::Starting),
            shutdown: CancellationToken::new(),
            version: VersionInfo::new(),
        }
    }

    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    pub fn pool(&self) -> &Arc<EmotePool> {
        &self.pool
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn health(&self) -> HealthSnapshot {
        let state = *self.health.read().await;
        let snapshot = self.pool.snapshot();
        HealthSnapshot {
            state,
            available_slots: snapshot.available(),
            total_slots: snapshot.capacity,
            active: snapshot.active,
            version: self.version.clone(),
        }
    }

    async fn set_health(&self, health: Health) {
        *self.health.write().await = health;
    }

    /// Run until shutdown is requested or the chat connection ends.
    pub async fn run<C: ChatConnection>(&self, mut chat: C) -> Result<(), ChatError> {
        let mut scheduler = ExpiryScheduler::new(Arc::clone(&self.pool), self.config.ttl);
        if let Some(period) = self.config.expiry_period {
            scheduler = scheduler.with_period(period);
        }
        let expiry = scheduler.spawn();

        let replier = chat.replier();
        let mut in_flight: JoinSet<()> = JoinSet::new();

        let outcome = loop {
            let step = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Step::Shutdown,
                Some(done) = in_flight.join_next(), if !in_flight.is_empty() => Step::CommandDone(done),
                event = chat.next_event() => Step::Event(event),
            };

            match step {
                Step::Shutdown => {
                    tracing::info!("Shutdown requested");
                    break Ok(());
                }
                Step::CommandDone(done) => {
                    if let Err(e) = done {
                        tracing::error!(error = %e, "Command task failed");
                    }
                }
                Step::Event(Ok(Some(ChatEvent::Ready))) => {
                    tracing::info!(channel = %self.config.channel, "Chat ready, joining channel");
                    if let Err(e) = chat.join(&self.config.channel).await {
                        break Err(e);
                    }
                    self.set_health(Health::Ready).await;
                }
                Step::Event(Ok(Some(ChatEvent::Command(invocation)))) => {
                    if !self.handler.matches(&invocation.command) {
                        continue;
                    }
                    let handler = Arc::clone(&self.handler);
                    let replier = Arc::clone(&replier);
                    in_flight.spawn(async move {
                        let reply = handler.handle(&invocation).await;
                        if let Err(e) = replier.reply(&invocation.target, &reply).await {
                            tracing::warn!(
                                user = %invocation.user_name,
                                error = %e,
                                "Failed to send reply"
                            );
                        }
                    });
                }
                Step::Event(Ok(None)) => {
                    tracing::info!("Chat connection ended");
                    break Ok(());
                }
                Step::Event(Err(e)) => {
                    tracing::error!(error = %e, "Chat connection failed");
                    break Err(e);
                }
            }
        };

        self.set_health(Health::ShuttingDown).await;

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "Command task failed");
            }
        }

        expiry.shutdown().await;

        let released = self.pool.release_all().await;
        tracing::info!(count = released.len(), "Released active emotes");

        if let Err(e) = chat.close().await {
            tracing::warn!(error = %e, "Error closing chat connection");
        }

        self.set_health(Health::Stopped).await;
        outcome
    }
}
