//! The supervisor: periodic driver, hang detection, terminal escalation.
//!
//! ## Files & responsibilities
//! - **core.rs**: the [`Supervisor`] kernel — start modes, tick accounting,
//!   the `die` escalation, the checkup wrap over its static container.
//! - **cron.rs**: the CancellationToken-guarded interval ticker.

mod core;
mod cron;

pub use core::{Supervisor, ENV_DIE_DELAY, ENV_INTERVAL, ENV_MAX_HANG_RETRIES};
