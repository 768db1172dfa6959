//! Runtime event plumbing: the broadcast [`Bus`] and the [`Event`] /
//! [`EventKind`] types it carries.
//!
//! Producers (publish to Bus):
//! - **Supervisor** → `CheckupPassed` / `CheckupFailed` / `HangRetrying` /
//!   `Dying` / `SupervisorStopped`
//! - **Containers** → `ChildCreated` / `ChildShutdown` / `RetryScheduled` /
//!   `AllRestarted`
//! - **SubscriberSet workers** → `SubscriberOverflow` / `SubscriberPanicked`
//!
//! Consumers: the single fan-out listener installed by
//! [`TreeBuilder::launch`](crate::TreeBuilder), which forwards to the
//! [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
