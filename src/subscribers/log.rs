//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [checkup-ok] comp=root
//! [checkup-failed] comp=root err="child 'h1' is missing"
//! [hang] comp=root overlaps=2
//! [child-created] comp=h1
//! [child-shutdown] comp=h1
//! [retry] comp=h1 attempt=2 delay=100ms
//! [restart-all] comp=root
//! [dying] err="fatal: hang limit exceeded"
//! [supervisor-stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Useful for development and the demos. Not intended for production —
/// implement a custom [`Subscribe`] for structured logging or metrics.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::CheckupPassed => {
                println!("[checkup-ok] comp={:?}", e.comp);
            }
            EventKind::CheckupFailed => {
                println!("[checkup-failed] comp={:?} err={:?}", e.comp, e.error);
            }
            EventKind::HangRetrying => {
                println!("[hang] comp={:?} overlaps={:?}", e.comp, e.attempt);
            }
            EventKind::ChildCreated => {
                println!("[child-created] comp={:?}", e.comp);
            }
            EventKind::ChildShutdown => {
                println!("[child-shutdown] comp={:?}", e.comp);
            }
            EventKind::RetryScheduled => {
                println!(
                    "[retry] comp={:?} attempt={:?} delay={:?} err={:?}",
                    e.comp, e.attempt, e.delay, e.error
                );
            }
            EventKind::AllRestarted => {
                println!("[restart-all] comp={:?}", e.comp);
            }
            EventKind::Dying => {
                println!("[dying] comp={:?} err={:?}", e.comp, e.error);
            }
            EventKind::SupervisorStopped => {
                println!("[supervisor-stopped]");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                println!("[subscriber-diag] err={:?}", e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
