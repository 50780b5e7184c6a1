//! Chat command handler: one command in, one pool operation, one reply out.

use std::sync::Arc;
use std::time::Duration;

use crate::chat::CommandInvocation;
use crate::pool::{EmotePool, PoolError};

pub const DEFAULT_COMMAND_NAME: &str = "7tv";

/// Argument meaning "use my name as the alias".
pub const DEFAULT_ALIAS_SENTINEL: &str = "-";

/// Reply texts. `{alias}` and `{ttl}` are substituted in `activated`.
#[derive(Debug, Clone)]
pub struct Replies {
    pub activated: String,
    pub exhausted: String,
    pub failed: String,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            activated: "{alias} is live for {ttl}s".to_string(),
            exhausted: "No emote slots available right now, try again in a bit".to_string(),
            failed: "Couldn't activate an emote, try again later".to_string(),
        }
    }
}

pub struct CommandHandler {
    pool: Arc<EmotePool>,
    name: String,
    sentinel: String,
    replies: Replies,
    ttl: Duration,
}

impl CommandHandler {
    pub fn new(pool: Arc<EmotePool>, ttl: Duration) -> Self {
        Self {
            pool,
            name: DEFAULT_COMMAND_NAME.to_string(),
            sentinel: DEFAULT_ALIAS_SENTINEL.to_string(),
            replies: Replies::default(),
            ttl,
        }
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    pub fn with_sentinel(mut self, sentinel: String) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn with_replies(mut self, replies: Replies) -> Self {
        self.replies = replies;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command names are case-insensitive.
    pub fn matches(&self, command: &str) -> bool {
        command.eq_ignore_ascii_case(&self.name)
    }

    /// First word of the argument, or the user's name when the argument is
    /// empty or the sentinel.
    pub fn resolve_alias(&self, user_name: &str, argument_text: &str) -> String {
        match argument_text.split_whitespace().next() {
            Some(word) if word != self.sentinel => word.to_string(),
            _ => user_name.to_string(),
        }
    }

    /// Allocate an emote for the invocation and produce the reply text.
    pub async fn handle(&self, invocation: &CommandInvocation) -> String {
        let alias = self.resolve_alias(&invocation.user_name, &invocation.argument_text);
        tracing::info!(user = %invocation.user_name, alias = %alias, "Emote requested");

        match self.pool.allocate(&alias).await {
            Ok(entry) => {
                render_activated(&self.replies.activated, entry.alias(), self.ttl.as_secs())
            }
            Err(PoolError::PoolExhausted) => {
                tracing::info!(user = %invocation.user_name, "No free emote slots");
                self.replies.exhausted.clone()
            }
            Err(e) => {
                tracing::warn!(user = %invocation.user_name, error = %e, "Emote activation failed");
                self.replies.failed.clone()
            }
        }
    }
}

/// Fill `{alias}` and `{ttl}` in one pass; the alias is user text and is
/// never expanded itself.
fn render_activated(template: &str, alias: &str, ttl_secs: u64) -> String {
    let ttl = ttl_secs.to_string();
    template
        .split("{alias}")
        .map(|part| part.replace("{ttl}", &ttl))
        .collect::<Vec<_>>()
        .join(alias)
}
