//! Recovery policies: bounded fixed-delay [`RetryPolicy`] and the
//! [`with_deadline`] timeout wrapper.

mod retry;
mod timeout;

pub use retry::{RetryPolicy, ENV_MAX_RETRIES, ENV_RETRY_DELAY};
pub use timeout::with_deadline;
