//! # Supervisor: the periodic root driver.
//!
//! A [`Supervisor`] extends the static container with a cron that drives a
//! health check down the tree every `interval`, hang detection over
//! still-pending checks, and the terminal `die` escalation — the root
//! refuses to limp along.
//!
//! ## Tick flow
//! ```text
//! cron fires
//!   ├─► previous tick still pending?
//!   │     yes → hang counter += 1
//!   │           counter > max_hang_retries → die
//!   │           otherwise → publish HangRetrying
//!   └─► no  → mark pending
//!             container checkup (one-for-all reconciliation)
//!             clear pending, reset hang counter
//!             publish CheckupPassed / CheckupFailed
//!             unrecoverable error → die
//! ```
//!
//! ## Rules
//! - Required env: `interval` (ms), `die_delay` (ms, negative disables the
//!   process exit for debugging), `max_hang_retries`.
//! - Synchronous start runs one health check first; if it fails the timer
//!   is never armed and the error is returned.
//! - Lazy start arms the timer immediately; the first tick builds the tree.
//! - `die` is the only place in the crate that may terminate the process,
//!   and only when `die_delay >= 0`, with exit code 1.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::components::{Component, Container, Probe};
use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;
use crate::events::{Event, EventKind};

use super::cron::Cron;

/// Env key holding the health-check interval (ms).
pub const ENV_INTERVAL: &str = "interval";
/// Env key holding the delay (ms) before process exit; negative disables.
pub const ENV_DIE_DELAY: &str = "die_delay";
/// Env key holding the allowed consecutive still-pending health checks.
pub const ENV_MAX_HANG_RETRIES: &str = "max_hang_retries";

/// Periodic health-check driver and terminal escalation point.
pub struct Supervisor {
    container: Container,
    interval: Duration,
    die_delay: Option<Duration>,
    max_hang_retries: u32,
    pending: AtomicBool,
    hangs: AtomicU32,
    cron: Cron,
}

impl Supervisor {
    /// Validates the spec (including the supervisor env keys) and builds
    /// the root container. The cron stays unarmed until a start call.
    pub fn new(ctx: &ContextRef, spec: ComponentSpec) -> Result<Self, CompError> {
        let interval = Duration::from_millis(spec.require_env_u64(ENV_INTERVAL)?);
        let die_ms = spec.require_env_i64(ENV_DIE_DELAY)?;
        let die_delay = if die_ms >= 0 {
            Some(Duration::from_millis(die_ms as u64))
        } else {
            None
        };
        let max_hang_retries = spec.require_env_u64(ENV_MAX_HANG_RETRIES)? as u32;

        Ok(Self {
            container: Container::new(ctx, spec)?,
            interval,
            die_delay,
            max_hang_retries,
            pending: AtomicBool::new(false),
            hangs: AtomicU32::new(0),
            cron: Cron::new(),
        })
    }

    /// The underlying static container.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// True once the periodic timer is armed.
    pub fn is_running(&self) -> bool {
        self.cron.is_armed() && !self.is_shutdown()
    }

    /// Synchronous start: run one health check now; only if it passes, arm
    /// the timer. A failing first check leaves the timer unarmed and
    /// returns the error.
    pub async fn start(self: Arc<Self>) -> Result<(), CompError> {
        let mut probe = Probe::default();
        self.container.checkup(&mut probe).await?;
        self.arm();
        Ok(())
    }

    /// Lazy start: arm the timer immediately. The first tick constructs the
    /// tree; subscribers observe per-tick results.
    pub fn start_lazy(self: Arc<Self>) {
        self.arm();
    }

    fn arm(self: Arc<Self>) {
        let weak = Arc::downgrade(&self);
        self.cron.arm(self.interval, move || {
            if let Some(s) = weak.upgrade() {
                tokio::spawn(async move { s.tick().await });
            }
        });
    }

    /// One health-check round with hang accounting.
    async fn tick(&self) {
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let overlaps = self.hangs.fetch_add(1, Ordering::AcqRel) + 1;
            if overlaps > self.max_hang_retries {
                let _ = self
                    .die(&CompError::Hang { overlaps }.to_string())
                    .await;
            } else {
                self.bus().publish(
                    Event::now(EventKind::HangRetrying)
                        .with_comp(self.container.spec().name.clone())
                        .with_attempt(overlaps),
                );
            }
            return;
        }

        let mut probe = Probe::default();
        let result = self.checkup(&mut probe).await;
        self.pending.store(false, Ordering::Release);
        self.hangs.store(0, Ordering::Release);

        let name = self.container.spec().name.clone();
        match result {
            Ok(()) => self
                .bus()
                .publish(Event::now(EventKind::CheckupPassed).with_comp(name)),
            Err(e) => self.bus().publish(
                Event::now(EventKind::CheckupFailed)
                    .with_comp(name)
                    .with_error(e.to_string()),
            ),
        }
    }

    /// Terminal escalation: log at error, schedule the process exit if
    /// enabled, shut the tree down, and return the dedicated fatal error.
    async fn die(&self, reason: &str) -> CompError {
        let name = self.container.spec().name.clone();
        error!(supervisor = %name, %reason, "supervision tree is going down");
        self.bus().publish(
            Event::now(EventKind::Dying)
                .with_comp(name)
                .with_error(reason),
        );

        if let Some(delay) = self.die_delay {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                std::process::exit(1);
            });
        }

        let _ = self.shutdown().await;
        CompError::Fatal {
            reason: reason.to_string(),
        }
    }

    fn bus(&self) -> &crate::events::Bus {
        self.container.children_ctx().bus()
    }
}

#[async_trait]
impl Component for Supervisor {
    fn spec(&self) -> &ComponentSpec {
        self.container.spec()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    fn instance_id(&self) -> u64 {
        self.container.instance_id()
    }

    fn is_shutdown(&self) -> bool {
        self.container.is_shutdown()
    }

    /// Wraps the container checkup so an unrecoverable error triggers
    /// [`die`](Supervisor::die): the root refuses to limp along.
    async fn checkup(&self, probe: &mut Probe) -> Result<(), CompError> {
        match self.container.checkup(probe).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.die(&e.to_string()).await),
        }
    }

    /// Stops the timer, then cascades the container shutdown.
    async fn shutdown(&self) -> Result<(), CompError> {
        self.cron.stop();
        let res = self.container.shutdown().await;
        self.bus().publish(Event::now(EventKind::SupervisorStopped));
        res
    }
}
