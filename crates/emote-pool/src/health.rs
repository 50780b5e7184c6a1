//! Health status types for the bot.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    /// Connecting to chat
    #[default]
    Starting,
    /// Joined the channel, handling commands
    Ready,
    /// Draining: no new commands, releasing active emotes
    ShuttingDown,
    /// Shutdown complete
    Stopped,
}

/// Response-only status (adds BUSY when every slot is taken).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthResponse {
    Starting,
    Ready,
    Busy,
    ShuttingDown,
    Stopped,
}

impl From<Health> for HealthResponse {
    fn from(health: Health) -> Self {
        match health {
            Health::Starting => HealthResponse::Starting,
            Health::Ready => HealthResponse::Ready,
            Health::ShuttingDown => HealthResponse::ShuttingDown,
            Health::Stopped => HealthResponse::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_default_is_starting() {
        assert_eq!(Health::default(), Health::Starting);
    }

    #[test]
    fn health_response_serializes_screaming_snake_case() {
        insta::assert_json_snapshot!(
            [
                HealthResponse::Starting,
                HealthResponse::Ready,
                HealthResponse::Busy,
                HealthResponse::ShuttingDown,
                HealthResponse::Stopped,
            ],
            @r###"
        [
          "STARTING",
          "READY",
          "BUSY",
          "SHUTTING_DOWN",
          "STOPPED"
        ]
        "###
        );
    }

    #[test]
    fn health_deserializes_screaming_snake_case() {
        assert_eq!(
            serde_json::from_str::<Health>("\"SHUTTING_DOWN\"").unwrap(),
            Health::ShuttingDown
        );
    }
}
