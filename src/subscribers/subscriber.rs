//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for observing the tree: checkup
//! results, restarts, child lifecycle, escalation. The supervisor's
//! "notifier" is nothing more than a subscriber watching checkup events.
//!
//! Delivery model (see [`SubscriberSet`](crate::SubscriberSet)):
//! - every subscriber gets its own bounded inbox and worker task;
//! - [`accepts`](Subscribe::accepts) filters event kinds before they are
//!   enqueued at all;
//! - a full inbox drops the event for that subscriber only;
//! - a panic inside a handler is contained and reported on the bus.

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// An observer of runtime events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    ///
    /// Runs on the subscriber's own worker task, in arrival order. A panic
    /// here is contained and surfaced as a `SubscriberPanicked` event;
    /// ordinary errors are the subscriber's own business.
    async fn on_event(&self, event: &Event);

    /// Event kinds this subscriber cares about.
    ///
    /// Returning `false` skips the enqueue entirely, so an uninterested
    /// subscriber costs nothing on the hot path. Defaults to everything.
    fn accepts(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// Short name used in overflow and panic diagnostics.
    fn name(&self) -> &'static str {
        "subscriber"
    }

    /// Capacity of this subscriber's inbox.
    fn queue_capacity(&self) -> usize {
        512
    }
}
