//! emote-pool: chat-triggered allocator for time-limited 7TV emote slots.

mod health;
mod version;

pub mod bot;
pub mod catalog;
pub mod chat;
pub mod command;
pub mod expiry;
pub mod pool;
pub mod registry;
pub mod transport;

pub use bot::{Bot, BotConfig, HealthSnapshot};
pub use catalog::{CatalogError, EmoteCatalog, EmoteId};
pub use chat::{ChatConnection, ChatError, ChatEvent, ChatReplier, TwitchChat, TwitchConfig};
pub use command::{CommandHandler, Replies};
pub use expiry::{DEFAULT_TTL, ExpiryHandle, ExpiryScheduler};
pub use health::{Health, HealthResponse};
pub use pool::{ActiveEmote, DEFAULT_CALL_TIMEOUT, EmotePool, PoolError, PoolSnapshot};
pub use registry::{EmoteRegistry, RegistryError, SevenTvConfig, SevenTvRegistry};
pub use version::{EMOTE_POOL_VERSION, VersionInfo, user_agent};
