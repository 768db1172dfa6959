//! # Deadline wrapper for asynchronous operations.
//!
//! There is no generic cancellation in the tree: a wrapped operation that
//! misses its deadline keeps running, but its eventual result is discarded
//! and the caller observes [`CompError::Timeout`].

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::errors::CompError;

/// Runs `fut` with a deadline.
///
/// Completes with [`CompError::Timeout`] if `fut` does not finish within
/// `dur`; the in-flight operation's eventual result is discarded.
pub async fn with_deadline<T>(
    dur: Duration,
    fut: impl Future<Output = Result<T, CompError>>,
) -> Result<T, CompError> {
    match time::timeout(dur, fut).await {
        Ok(res) => res,
        Err(_elapsed) => Err(CompError::Timeout { timeout: dur }),
    }
}
