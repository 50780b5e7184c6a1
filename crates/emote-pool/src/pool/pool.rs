//! EmotePool - allocation, release and expiry over the shared pool state.
//!
//! The state mutex is held only for in-memory moves. Remote calls run with
//! the id parked in `reserved` or `releasing`, tracked by a guard that puts
//! it back in `free` if the future is dropped mid-call.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::ActiveEmote;
use super::state::{PoolSnapshot, PoolState};
use crate::catalog::{EmoteCatalog, EmoteId};
use crate::registry::{EmoteRegistry, RegistryError};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("no free emote slots")]
    PoolExhausted,
    #[error("registry rejected emote {id} as '{alias}': {source}")]
    RegistryRejected {
        id: EmoteId,
        alias: String,
        #[source]
        source: RegistryError,
    },
    #[error("emote {0} is not active")]
    NotActive(EmoteId),
}

fn lock_state(state: &StdMutex<PoolState>) -> MutexGuard<'_, PoolState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!("Pool state mutex poisoned - recovering");
            poisoned.into_inner()
        }
    }
}

/// An id taken from `free` while the remote add runs.
///
/// Dropping without `commit` returns the id to `free`.
struct Reservation {
    state: Arc<StdMutex<PoolState>>,
    id: EmoteId,
    armed: bool,
}

impl Reservation {
    fn commit(mut self, alias: String) -> ActiveEmote {
        self.armed = false;
        let entry = ActiveEmote::new(self.id.clone(), alias, Utc::now());
        lock_state(&self.state).commit(entry.clone());
        entry
    }

    fn rollback(mut self) {
        self.armed = false;
        lock_state(&self.state).rollback(self.id.clone());
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(emote = %self.id, "Allocation abandoned mid-flight - returning slot to pool");
            lock_state(&self.state).rollback(self.id.clone());
        }
    }
}

/// An entry taken out of `active` while the remote remove runs.
///
/// The id always ends up back in `free`, whether `finish` is called or the
/// ticket is dropped.
struct ReleaseTicket {
    state: Arc<StdMutex<PoolState>>,
    entry: ActiveEmote,
    armed: bool,
}

impl ReleaseTicket {
    fn finish(mut self) -> ActiveEmote {
        self.armed = false;
        lock_state(&self.state).finish_release(self.entry.id());
        self.entry.clone()
    }
}

impl Drop for ReleaseTicket {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(emote = %self.entry.id(), "Release abandoned mid-flight - reclaiming slot locally");
            lock_state(&self.state).finish_release(self.entry.id());
        }
    }
}

/// The shared emote pool.
///
/// Share as `Arc<EmotePool>` between the command handler, the expiry
/// scheduler and the status server.
pub struct EmotePool {
    state: Arc<StdMutex<PoolState>>,
    registry: Arc<dyn EmoteRegistry>,
    capacity: usize,
    call_timeout: Duration,
}

impl EmotePool {
    pub fn new(catalog: EmoteCatalog, registry: Arc<dyn EmoteRegistry>) -> Self {
        let capacity = catalog.len();
        Self {
            state: Arc::new(StdMutex::new(PoolState::new(catalog))),
            registry,
            capacity,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound every registry call. A timed-out add fails the allocation; a
    /// timed-out remove still releases locally.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        lock_state(&self.state).free_len()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        lock_state(&self.state).snapshot()
    }

    /// Activate a random free emote under `alias`.
    pub async fn allocate(&self, alias: &str) -> Result<ActiveEmote, PoolError> {
        let reservation = {
            let mut state = lock_state(&self.state);
            let id = state
                .reserve_random(&mut rand::thread_rng())
                .ok_or(PoolError::PoolExhausted)?;
            Reservation {
                state: Arc::clone(&self.state),
                id,
                armed: true,
            }
        };

        let id = reservation.id.clone();
        tracing::debug!(emote = %id, alias, "Reserved emote slot");

        let added = tokio::time::timeout(self.call_timeout, self.registry.add(alias, &id))
            .await
            .unwrap_or(Err(RegistryError::Timeout(self.call_timeout)));

        match added {
            Ok(()) => {
                let entry = reservation.commit(alias.to_string());
                tracing::info!(emote = %id, alias, "Emote activated");
                Ok(entry)
            }
            Err(source) => {
                reservation.rollback();
                tracing::warn!(emote = %id, alias, error = %source, "Registry rejected emote, slot returned");
                Err(PoolError::RegistryRejected {
                    id,
                    alias: alias.to_string(),
                    source,
                })
            }
        }
    }

    /// Remove an active emote remotely and return its slot.
    ///
    /// The slot is reclaimed even if the remote removal fails.
    pub async fn release(&self, id: &EmoteId) -> Result<(), PoolError> {
        let ticket = self
            .begin_release(id)
            .ok_or_else(|| PoolError::NotActive(id.clone()))?;
        self.finish_release(ticket).await;
        Ok(())
    }

    /// Release every entry with `now - activated_at >= ttl`.
    ///
    /// Entries are taken out of `active` atomically, so a concurrent or later
    /// call never returns them again.
    pub async fn collect_expired(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<ActiveEmote> {
        let tickets: Vec<ReleaseTicket> = {
            let mut state = lock_state(&self.state);
            state
                .begin_release_expired(now, ttl)
                .into_iter()
                .map(|entry| self.ticket(entry))
                .collect()
        };

        if tickets.is_empty() {
            return Vec::new();
        }
        tracing::debug!(count = tickets.len(), "Releasing expired emotes");

        futures::future::join_all(tickets.into_iter().map(|t| self.finish_release(t))).await
    }

    /// Release everything still active. Used on shutdown.
    pub async fn release_all(&self) -> Vec<ActiveEmote> {
        let tickets: Vec<ReleaseTicket> = {
            let mut state = lock_state(&self.state);
            state
                .begin_release_all()
                .into_iter()
                .map(|entry| self.ticket(entry))
                .collect()
        };

        futures::future::join_all(tickets.into_iter().map(|t| self.finish_release(t))).await
    }

    fn ticket(&self, entry: ActiveEmote) -> ReleaseTicket {
        ReleaseTicket {
            state: Arc::clone(&self.state),
            entry,
            armed: true,
        }
    }

    fn begin_release(&self, id: &EmoteId) -> Option<ReleaseTicket> {
        let entry = lock_state(&self.state).begin_release(id)?;
        Some(self.ticket(entry))
    }

    async fn finish_release(&self, ticket: ReleaseTicket) -> ActiveEmote {
        let entry = &ticket.entry;
        let removed = tokio::time::timeout(self.call_timeout, self.registry.remove(entry.id()))
            .await
            .unwrap_or(Err(RegistryError::Timeout(self.call_timeout)));

        match removed {
            Ok(()) => {
                tracing::info!(emote = %entry.id(), alias = %entry.alias(), "Emote released");
            }
            Err(e) => {
                // Local reclaim wins; the remote set may still hold the emote.
                tracing::warn!(
                    emote = %entry.id(),
                    alias = %entry.alias(),
                    error = %e,
                    "Remote removal failed, reclaiming slot anyway"
                );
            }
        }

        ticket.finish()
    }
}
