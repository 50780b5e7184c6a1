//! Version information for emote-pool.

/// Crate version from Cargo.toml
pub const EMOTE_POOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent to the 7TV API.
pub fn user_agent() -> String {
    format!("emote-pool/{}", EMOTE_POOL_VERSION)
}

/// Version information reported by the status endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    pub emote_pool: &'static str,
    /// Name of the bot account, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot: Option<String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            emote_pool: EMOTE_POOL_VERSION,
            bot: None,
        }
    }
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bot(mut self, bot: String) -> Self {
        self.bot = Some(bot);
        self
    }
}
