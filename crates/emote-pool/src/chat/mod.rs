//! Chat platform boundary.
//!
//! The bot only consumes two kinds of events (ready, command invoked) and
//! needs one way to answer. Platforms implement `ChatConnection` for the
//! event stream and hand out a shareable `ChatReplier` so replies can be
//! sent from command tasks while the event loop keeps reading.

mod irc;
mod twitch;

use std::sync::Arc;

use async_trait::async_trait;

pub use irc::IrcMessage;
pub use twitch::{TWITCH_IRC_URL, TwitchChat, TwitchConfig};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to connect to chat: {0}")]
    Connect(String),
    #[error("chat connection closed")]
    Closed,
    #[error("failed to send chat message: {0}")]
    Send(String),
    #[error("chat protocol error: {0}")]
    Protocol(String),
}

/// Where a reply goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub channel: String,
    /// Message being answered, for threaded replies.
    pub message_id: Option<String>,
}

/// A prefixed chat command, e.g. `!7tv catJAM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Command name without prefix.
    pub command: String,
    pub user_name: String,
    /// Everything after the command name, trimmed.
    pub argument_text: String,
    pub target: ReplyTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Logged in; channels can be joined.
    Ready,
    Command(CommandInvocation),
}

#[async_trait]
pub trait ChatReplier: Send + Sync {
    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<(), ChatError>;
}

#[async_trait]
pub trait ChatConnection: Send {
    /// Next event, or `None` once the connection is closed.
    ///
    /// Must be cancel-safe: it is polled inside `select!`.
    async fn next_event(&mut self) -> Result<Option<ChatEvent>, ChatError>;

    async fn join(&mut self, channel: &str) -> Result<(), ChatError>;

    fn replier(&self) -> Arc<dyn ChatReplier>;

    async fn close(&mut self) -> Result<(), ChatError>;
}

/// Split `!name rest of line` into `("name", "rest of line")`.
pub fn parse_command<'a>(text: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let body = text.trim().strip_prefix(prefix)?;
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some((name, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_splits_name_and_arguments() {
        assert_eq!(parse_command("!7tv catJAM", "!"), Some(("7tv", "catJAM")));
        assert_eq!(
            parse_command("  !7tv   two words  ", "!"),
            Some(("7tv", "two words"))
        );
        assert_eq!(parse_command("!7tv", "!"), Some(("7tv", "")));
    }

    #[test]
    fn parse_command_ignores_plain_chat() {
        assert_eq!(parse_command("hello !7tv", "!"), None);
        assert_eq!(parse_command("!", "!"), None);
        assert_eq!(parse_command("! 7tv", "!"), None);
    }

    #[test]
    fn parse_command_with_custom_prefix() {
        assert_eq!(parse_command("?emote pog", "?"), Some(("emote", "pog")));
        assert_eq!(parse_command("!emote pog", "?"), None);
    }
}
