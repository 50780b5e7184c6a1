//! Expiry scheduler - periodically reclaims emotes past their TTL.
//!
//! The scheduler is a single background task driven by a tokio interval.
//! Cancellation is checked between ticks only, so a collection that already
//! started (remote removals included) always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pool::{ActiveEmote, EmotePool};

/// Reference lifetime of an activated emote.
pub const DEFAULT_TTL: Duration = Duration::from_secs(20);

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct ExpiryScheduler {
    pool: Arc<EmotePool>,
    ttl: Duration,
    period: Duration,
}

impl ExpiryScheduler {
    /// Scan every `ttl`, releasing entries at least `ttl` old.
    pub fn new(pool: Arc<EmotePool>, ttl: Duration) -> Self {
        Self {
            pool,
            ttl,
            period: ttl,
        }
    }

    /// Scan more (or less) often than once per TTL.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run one collection pass now.
    pub async fn tick(&self) -> Vec<ActiveEmote> {
        self.pool.collect_expired(Utc::now(), self.ttl).await
    }

    pub fn spawn(self) -> ExpiryHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        ExpiryHandle {
            cancel,
            task: Some(task),
        }
    }

    async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period.max(MIN_PERIOD));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            ttl_secs = self.ttl.as_secs_f64(),
            period_secs = self.period.as_secs_f64(),
            "Expiry scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let released = self.tick().await;
            if !released.is_empty() {
                tracing::info!(count = released.len(), "Expired emotes released");
            }
        }

        tracing::info!("Expiry scheduler stopped");
    }
}

/// Handle to the running scheduler.
///
/// Dropping the handle cancels the timer; `shutdown` also waits for the task.
pub struct ExpiryHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ExpiryHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the timer and wait for any in-flight collection to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "Expiry scheduler task failed");
        }
    }
}

impl Drop for ExpiryHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
