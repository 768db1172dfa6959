//! # Runtime events emitted by the supervisor and containers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Checkup events**: per-tick health results and hang retries
//! - **Child lifecycle events**: create, shutdown, retry, cascade restarts
//! - **Terminal events**: the supervisor dying or stopping
//! - **Subscriber diagnostics**: overflow and panic reports
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! component name, error messages, and retry delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, so events can be ordered correctly even when delivered
//! out-of-order through async channels.
//!
//! ## Event flow examples
//!
//! ### First tick of a fresh tree
//! ```text
//! CheckupFailed (children missing)
//!   → ChildCreated × N
//!   → AllRestarted
//!   → CheckupPassed (next tick)
//! ```
//!
//! ### Hang escalation
//! ```text
//! HangRetrying × max_hang_retries
//!   → Dying
//!   → SupervisorStopped
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    SubscriberPanicked,
    /// Subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,

    // === Checkup events ===
    /// A periodic health check completed successfully.
    CheckupPassed,
    /// A periodic health check failed.
    CheckupFailed,
    /// The previous health check was still pending when the tick fired.
    HangRetrying,

    // === Child lifecycle events ===
    /// A child component was created and registered.
    ChildCreated,
    /// A child component was shut down by its parent.
    ChildShutdown,
    /// A child operation failed and a bounded retry was scheduled.
    RetryScheduled,
    /// A static container completed a full one-for-all restart cycle.
    AllRestarted,

    // === Terminal events ===
    /// The supervisor decided to terminate the tree.
    Dying,
    /// The supervisor's cron was stopped and its subtree shut down.
    SupervisorStopped,
}

/// Runtime event with optional metadata.
///
/// ## Fields
/// - `seq`: unique sequence number for ordering (monotonically increasing)
/// - `at`: wall-clock timestamp (may go backwards due to NTP, logging only)
/// - `kind`: event classification
/// - `comp`, `error`, `attempt`, `delay`: optional metadata
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (may go backwards, use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Name of the component, if applicable.
    pub comp: Option<String>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
    /// Retry attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next retry (if relevant).
    pub delay: Option<Duration>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            comp: None,
            error: None,
            attempt: None,
            delay: None,
        }
    }

    /// Attaches a component name.
    pub fn with_comp(mut self, name: impl Into<String>) -> Self {
        self.comp = Some(name.into());
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches a retry attempt count.
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay.
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    /// Creates a subscriber overflow event.
    ///
    /// Emitted when a subscriber's queue is full and an event is dropped.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_error(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_comp(subscriber)
            .with_error(info)
    }

    /// True for internally-generated overflow diagnostics.
    pub fn is_subscriber_overflow(&self) -> bool {
        self.kind == EventKind::SubscriberOverflow
    }

    /// True for internally-generated panic diagnostics.
    pub fn is_subscriber_panic(&self) -> bool {
        self.kind == EventKind::SubscriberPanicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::now(EventKind::CheckupPassed);
        let b = Event::now(EventKind::CheckupPassed);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_attach_metadata() {
        let ev = Event::now(EventKind::ChildCreated)
            .with_comp("h1")
            .with_error("boom")
            .with_attempt(3)
            .with_delay(Duration::from_millis(10));
        assert_eq!(ev.comp.as_deref(), Some("h1"));
        assert_eq!(ev.error.as_deref(), Some("boom"));
        assert_eq!(ev.attempt, Some(3));
        assert_eq!(ev.delay, Some(Duration::from_millis(10)));
    }
}
