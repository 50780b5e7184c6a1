//! ActiveEmote - one emote currently published in the remote set.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::catalog::EmoteId;

/// A currently activated emote.
///
/// Only the pool creates these; callers receive copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveEmote {
    id: EmoteId,
    alias: String,
    activated_at: DateTime<Utc>,
}

impl ActiveEmote {
    pub(crate) fn new(id: EmoteId, alias: String, activated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            alias,
            activated_at,
        }
    }

    pub fn id(&self) -> &EmoteId {
        &self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.activated_at
            .checked_add_signed(ttl_delta(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// True once `now - activated_at >= ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.activated_at) >= ttl_delta(ttl)
    }
}

fn ttl_delta(ttl: Duration) -> TimeDelta {
    TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
}
