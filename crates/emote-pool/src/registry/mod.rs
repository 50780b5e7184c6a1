//! External emote registry: the remote emote set the pool publishes into.
//!
//! The pool only needs two operations, both reporting success or failure:
//! - `add`: publish an emote under an alias
//! - `remove`: take an emote back out
//!
//! Neither is assumed idempotent remotely. Pool correctness depends only on
//! local state.

mod seventv;

use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::EmoteId;

pub use seventv::{DEFAULT_API_URL, SevenTvConfig, SevenTvRegistry};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry rejected the request: {0}")]
    Rejected(String),
    #[error("registry returned a malformed response: {0}")]
    Malformed(String),
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry call timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid registry token")]
    InvalidToken,
}

/// Remote emote set operations.
#[async_trait]
pub trait EmoteRegistry: Send + Sync {
    /// Publish `id` in the remote set under `alias`.
    async fn add(&self, alias: &str, id: &EmoteId) -> Result<(), RegistryError>;

    /// Remove `id` from the remote set.
    async fn remove(&self, id: &EmoteId) -> Result<(), RegistryError>;
}
