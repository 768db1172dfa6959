//! # Event fan-out.
//!
//! [`SubscriberSet`] hands each [`Subscribe`] implementation its own
//! bounded inbox and worker task, so one slow or panicking subscriber can
//! never stall the publisher or its peers.
//!
//! ```text
//! emit_arc(ev) ──┬── accepts? ──► inbox A ──► worker A ──► on_event
//!                ├── accepts? ──► inbox B ──► worker B ──► on_event
//!                └── full / closed inbox → drop + SubscriberOverflow
//! ```
//!
//! Delivery is best-effort: `emit_arc` never waits. Each subscriber sees
//! its accepted events in arrival order; there is no ordering across
//! subscribers.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{Bus, Event};
use crate::util::panic_message;

use super::Subscribe;

/// What happened when an event was offered to one subscriber.
enum Delivery {
    /// Enqueued on the subscriber's inbox.
    Accepted,
    /// The subscriber does not accept this event kind.
    Skipped,
    /// The inbox is full; the event was dropped for this subscriber.
    QueueFull,
    /// The worker is gone and its inbox closed.
    WorkerGone,
}

/// One subscriber together with its inbox and worker task.
struct SubscriberWorker {
    sub: Arc<dyn Subscribe>,
    inbox: mpsc::Sender<Arc<Event>>,
    join: JoinHandle<()>,
}

impl SubscriberWorker {
    /// Spawns the worker loop for `sub`.
    ///
    /// The loop runs until the inbox closes. `on_event` executes under
    /// `catch_unwind`; a panic is reported as `SubscriberPanicked` and the
    /// worker keeps going.
    fn spawn(sub: Arc<dyn Subscribe>, bus: Bus) -> Self {
        let (inbox, mut events) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
        let handler = Arc::clone(&sub);

        let join = tokio::spawn(async move {
            while let Some(ev) = events.recv().await {
                let attempt = std::panic::AssertUnwindSafe(handler.on_event(&ev)).catch_unwind();
                if let Err(payload) = attempt.await {
                    bus.publish(Event::subscriber_panicked(
                        handler.name(),
                        panic_message(payload.as_ref()),
                    ));
                }
            }
        });

        Self { sub, inbox, join }
    }

    /// Offers an event without blocking.
    fn offer(&self, ev: &Arc<Event>) -> Delivery {
        if !self.sub.accepts(ev.kind) {
            return Delivery::Skipped;
        }
        match self.inbox.try_send(Arc::clone(ev)) {
            Ok(()) => Delivery::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::QueueFull,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::WorkerGone,
        }
    }
}

/// Best-effort fan-out over a set of independent subscriber workers.
pub struct SubscriberSet {
    workers: Vec<SubscriberWorker>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber.
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let workers = subscribers
            .into_iter()
            .map(|sub| SubscriberWorker::spawn(sub, bus.clone()))
            .collect();
        Self { workers, bus }
    }

    /// Emits a borrowed event (clones it once).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Fans a shared event out to every interested subscriber.
    ///
    /// Never blocks. An event that cannot be enqueued is dropped for that
    /// subscriber and reported as `SubscriberOverflow` — unless the event
    /// is itself a subscriber diagnostic, which must not feed back on
    /// itself.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let diagnostic = event.is_subscriber_overflow() || event.is_subscriber_panic();

        for worker in &self.workers {
            let reason = match worker.offer(&event) {
                Delivery::Accepted | Delivery::Skipped => continue,
                Delivery::QueueFull => "full",
                Delivery::WorkerGone => "closed",
            };
            if !diagnostic {
                self.bus
                    .publish(Event::subscriber_overflow(worker.sub.name(), reason));
            }
        }
    }

    /// Closes every inbox and waits for the workers to drain.
    pub async fn shutdown(self) {
        for worker in self.workers {
            drop(worker.inbox);
            let _ = worker.join.await;
        }
    }
}
