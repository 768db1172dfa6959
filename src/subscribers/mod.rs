//! Subscriber plumbing: the [`Subscribe`] extension trait, the
//! [`SubscriberSet`] fan-out engine, and the stock [`LogWriter`].

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
