//! # Interval ticker for the supervisor.
//!
//! [`Cron`] owns a background task that fires a callback every interval,
//! guarded by a [`CancellationToken`]. Ticks are delivered synchronously to
//! the callback; the supervisor spawns the actual health check from there,
//! which is what lets hang detection observe an overlap — the cron never
//! waits for a tick to finish.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// CancellationToken-guarded interval ticker.
pub(crate) struct Cron {
    token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Cron {
    /// Creates an unarmed cron.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Arms the ticker. The first tick fires immediately; subsequent ticks
    /// every `every`. Arming twice is a no-op.
    pub fn arm(&self, every: Duration, tick: impl Fn() + Send + 'static) {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() || self.token.is_cancelled() {
            return;
        }

        let token = self.token.clone();
        *slot = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => tick(),
                }
            }
        }));
    }

    /// True once [`arm`](Cron::arm) has been called.
    pub fn is_armed(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stops the ticker. Idempotent; never blocks on the ticker task.
    pub fn stop(&self) {
        self.token.cancel();
        if let Some(h) = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            h.abort();
        }
    }
}
