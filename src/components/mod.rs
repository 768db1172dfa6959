//! Component kernels: the [`Component`] contract, the base [`Kernel`], and
//! the three container flavors.
//!
//! ## Files & responsibilities
//! - **kernel.rs**: the `Component` trait, the [`Probe`] checkup data, and
//!   the base kernel every concrete component embeds (monotonic shutdown,
//!   identity-checked deregistration).
//! - **children.rs**: the shared child-set engine (check / create /
//!   shutdown / check-and-restart under a retry policy, unknown sweep).
//! - **container.rs**: static membership, one-for-all cascade restarts.
//! - **dynamic.rs**: runtime membership, one-for-one restarts, per-name
//!   serialization through hashed shard locks.
//! - **transactional.rs**: two-phase commit, JSON state snapshot, lazy
//!   action log.
//!
//! Composition is explicit embedding, not inheritance: each derived kernel
//! holds its parent kernel and chains to the parent's methods where its own
//! behavior wraps them.

mod children;
mod container;
mod dynamic;
mod kernel;
mod transactional;

pub use container::Container;
pub use dynamic::{DynamicContainer, QUEUE_SHARDS};
pub use kernel::{Component, ComponentRef, Kernel, Probe};
pub use transactional::{
    Action, ApplyAction, Transactional, TransactionalContainer, CP_LOG, CP_STATE,
};
