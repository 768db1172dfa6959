//! # Global runtime configuration.
//!
//! [`Config`] defines the tree-wide runtime settings: event bus capacity and
//! the shutdown grace period. Per-component knobs (retry bounds, check
//! intervals, hang limits) ride in each component's spec `env` instead, so
//! they merge and override like any other description value.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use compvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.grace = Duration::from_secs(10);
//!
//! assert_eq!(cfg.bus_capacity, 1024);
//! ```

use std::time::Duration;

/// Tree-wide configuration for the runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Maximum time to wait for a graceful tree shutdown.
    pub grace: Duration,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
        }
    }
}
