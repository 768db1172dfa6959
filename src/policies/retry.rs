//! # Bounded fixed-delay retry.
//!
//! [`RetryPolicy`] drives every recoverable child operation: create,
//! shutdown, and the restart cycles of both container flavors. Unlike a
//! growing backoff, the delay between attempts is fixed — a supervised tree
//! wants predictable reconciliation latency, not politeness toward an
//! external service.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use compvisor::RetryPolicy;
//!
//! let retry = RetryPolicy {
//!     max_retries: 3,
//!     delay: Duration::from_millis(100),
//! };
//! assert_eq!(retry.attempts(), 4); // initial try + 3 retries
//! ```

use std::future::Future;
use std::time::Duration;

use crate::description::ComponentSpec;
use crate::errors::{CompError, SpecError};

/// Env key holding the retry bound of a container.
pub const ENV_MAX_RETRIES: &str = "max_retries";
/// Env key holding the delay (ms) between retries.
pub const ENV_RETRY_DELAY: &str = "retry_delay";

/// Fixed-delay bounded retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Reads the policy from a container spec's env.
    ///
    /// Both `max_retries` and `retry_delay` are required for containers;
    /// a missing or non-integer value fails construction.
    pub fn from_spec(spec: &ComponentSpec) -> Result<Self, SpecError> {
        let max_retries = spec.require_env_u64(ENV_MAX_RETRIES)? as u32;
        let delay_ms = spec.require_env_u64(ENV_RETRY_DELAY)?;
        Ok(Self {
            max_retries,
            delay: Duration::from_millis(delay_ms),
        })
    }

    /// Total attempts this policy allows (initial try included).
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Runs `op` until it succeeds, fails terminally, or the attempt budget
    /// is exhausted.
    ///
    /// `op` receives the 1-based attempt number. Attempts are separated by
    /// the fixed [`delay`](RetryPolicy::delay); once the budget is spent the
    /// failure is wrapped in [`CompError::RetryExhausted`] carrying the last
    /// underlying error.
    ///
    /// Retryability gates every iteration: an error whose
    /// [`is_retryable`](CompError::is_retryable) is false (a rejected spec,
    /// a panicked factory, an exhausted inner retry) is returned as-is
    /// without burning the remaining attempts.
    ///
    /// Retries are not cancellable externally; callers bound the whole
    /// operation with [`with_deadline`](crate::policies::with_deadline) when
    /// they need a ceiling.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, CompError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, CompError>>,
    {
        let attempts = self.attempts();
        let mut last = None;

        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    last = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }

        Err(CompError::RetryExhausted {
            attempts,
            last: Box::new(last.unwrap_or_else(|| CompError::app("no attempts made"))),
        })
    }
}
