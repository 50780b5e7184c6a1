//! In-memory partition of the catalog.
//!
//! Every catalog id sits in exactly one of four places:
//! - `free`: may be handed out
//! - `reserved`: taken by an allocation whose remote add is running
//! - `active`: published, waiting for release or expiry
//! - `releasing`: taken out of `active`, remote remove running
//!
//! All moves happen under the pool mutex, so no observer sees an id twice.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use super::ActiveEmote;
use crate::catalog::{EmoteCatalog, EmoteId};

pub(crate) struct PoolState {
    free: Vec<EmoteId>,
    reserved: HashSet<EmoteId>,
    active: HashMap<EmoteId, ActiveEmote>,
    releasing: HashMap<EmoteId, ActiveEmote>,
}

impl PoolState {
    pub fn new(catalog: EmoteCatalog) -> Self {
        Self {
            free: catalog.into_iter().collect(),
            reserved: HashSet::new(),
            active: HashMap::new(),
            releasing: HashMap::new(),
        }
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Move a uniformly chosen free id into `reserved`.
    pub fn reserve_random(&mut self, rng: &mut impl Rng) -> Option<EmoteId> {
        if self.free.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.free.len());
        let id = self.free.swap_remove(index);
        self.reserved.insert(id.clone());
        Some(id)
    }

    /// `reserved` → `active`.
    pub fn commit(&mut self, entry: ActiveEmote) {
        if !self.reserved.remove(entry.id()) {
            tracing::error!(emote = %entry.id(), "Bug: committing an id that was not reserved");
            return;
        }
        self.active.insert(entry.id().clone(), entry);
    }

    /// `reserved` → `free`.
    pub fn rollback(&mut self, id: EmoteId) {
        if !self.reserved.remove(&id) {
            tracing::error!(emote = %id, "Bug: rolling back an id that was not reserved");
            return;
        }
        self.free.push(id);
    }

    /// `active` → `releasing`. None if the id is not active.
    pub fn begin_release(&mut self, id: &EmoteId) -> Option<ActiveEmote> {
        let entry = self.active.remove(id)?;
        self.releasing.insert(id.clone(), entry.clone());
        Some(entry)
    }

    /// Move every expired entry to `releasing`, oldest first.
    pub fn begin_release_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<ActiveEmote> {
        let mut expired: Vec<EmoteId> = self
            .active
            .values()
            .filter(|entry| entry.is_expired(now, ttl))
            .map(|entry| entry.id().clone())
            .collect();
        expired.sort_by_key(|id| self.active[id].activated_at());

        expired
            .iter()
            .filter_map(|id| self.begin_release(id))
            .collect()
    }

    /// Move every active entry to `releasing`, oldest first.
    pub fn begin_release_all(&mut self) -> Vec<ActiveEmote> {
        let mut ids: Vec<EmoteId> = self.active.keys().cloned().collect();
        ids.sort_by_key(|id| self.active[id].activated_at());

        ids.iter().filter_map(|id| self.begin_release(id)).collect()
    }

    /// `releasing` → `free`.
    pub fn finish_release(&mut self, id: &EmoteId) {
        if self.releasing.remove(id).is_none() {
            tracing::error!(emote = %id, "Bug: finishing release of an id that was not releasing");
            return;
        }
        self.free.push(id.clone());
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let mut free = self.free.clone();
        free.sort();
        let mut reserved: Vec<EmoteId> = self.reserved.iter().cloned().collect();
        reserved.sort();
        let mut active: Vec<ActiveEmote> = self.active.values().cloned().collect();
        active.sort_by(|a, b| {
            a.activated_at()
                .cmp(&b.activated_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        let mut releasing: Vec<EmoteId> = self.releasing.keys().cloned().collect();
        releasing.sort();

        PoolSnapshot {
            capacity: free.len() + reserved.len() + active.len() + releasing.len(),
            free,
            reserved,
            active,
            releasing,
        }
    }
}

/// Consistent copy of the pool at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub capacity: usize,
    pub free: Vec<EmoteId>,
    pub reserved: Vec<EmoteId>,
    pub active: Vec<ActiveEmote>,
    pub releasing: Vec<EmoteId>,
}

impl PoolSnapshot {
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// No allocation or release in flight.
    pub fn is_quiescent(&self) -> bool {
        self.reserved.is_empty() && self.releasing.is_empty()
    }

    pub fn is_free(&self, id: &EmoteId) -> bool {
        self.free.contains(id)
    }

    pub fn is_active(&self, id: &EmoteId) -> bool {
        self.active.iter().any(|entry| entry.id() == id)
    }

    /// True when the four sets are disjoint and together equal `catalog`.
    pub fn is_partition_of(&self, catalog: &EmoteCatalog) -> bool {
        let all: Vec<&EmoteId> = self
            .free
            .iter()
            .chain(self.reserved.iter())
            .chain(self.active.iter().map(ActiveEmote::id))
            .chain(self.releasing.iter())
            .collect();
        let unique: HashSet<&EmoteId> = all.iter().copied().collect();

        all.len() == unique.len()
            && unique.len() == catalog.len()
            && catalog.ids().iter().all(|id| unique.contains(id))
    }
}
