//! # Static container: fixed membership, one-for-all supervision.
//!
//! A [`Container`] owns the ordered, immutable set of children declared in
//! its spec. Children start in declaration order and stop in reverse
//! declaration order. When any non-temporary child fails a health check,
//! the whole set is torn down and rebuilt — the one-for-all policy — so
//! sibling components never observe a partially-restarted peer group.
//!
//! ## Checkup flow
//! ```text
//! kernel check
//!   → sweep unknowns (not expected, not adopted) — shutdown, no restart
//!   → check expected children in declaration order
//!       all pass → Ok
//!       any fails → shutdown ALL (reverse order)
//!                 → re-create ALL (declaration order, bounded retries)
//!                 → probe.restart_all = true, publish AllRestarted
//!       cycle fails → own shutdown, propagate the ORIGINAL error
//! ```
//!
//! ## Rules
//! - `env.max_retries` and `env.retry_delay` are required.
//! - A fresh container has no children until its first checkup builds them;
//!   lazy construction and crash recovery are the same code path.
//! - `do_not_restart` in the probe turns the restart step into a failure.
//! - Temporary children are exempt from triggering the cascade.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::task::yield_now;
use tracing::debug;

use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;
use crate::events::{Event, EventKind};
use crate::policies::RetryPolicy;

use super::children::ChildSet;
use super::kernel::{Component, Kernel, Probe};

/// Static container kernel with one-for-all supervision.
pub struct Container {
    kernel: Kernel,
    kids: ChildSet,
    children: Vec<ComponentSpec>,
}

impl Container {
    /// Validates the spec, reads the retry policy from its env, and builds
    /// the container with an empty children context.
    pub fn new(ctx: &ContextRef, spec: ComponentSpec) -> Result<Self, CompError> {
        let retry = RetryPolicy::from_spec(&spec)?;
        let kernel = Kernel::new(ctx, spec)?;
        let kids = ChildSet::new(ctx, kernel.name().to_string(), retry);
        let children = kernel.spec().components.clone();
        Ok(Self {
            kernel,
            kids,
            children,
        })
    }

    /// The declared children, in declaration order.
    pub fn children(&self) -> &[ComponentSpec] {
        &self.children
    }

    /// The children context (`$.$`).
    pub fn children_ctx(&self) -> &ContextRef {
        self.kids.ctx()
    }

    fn expected_names(&self) -> HashSet<&str> {
        self.children.iter().map(|c| c.name.as_str()).collect()
    }

    /// One full one-for-all cycle: tear down in reverse declaration order,
    /// rebuild in declaration order.
    async fn restart_all(&self) -> Result<(), CompError> {
        for spec in self.children.iter().rev() {
            yield_now().await;
            self.kids.shutdown_child(&spec.name).await?;
        }
        for spec in &self.children {
            yield_now().await;
            self.kids.create_child(spec).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Component for Container {
    fn spec(&self) -> &ComponentSpec {
        self.kernel.spec()
    }

    fn as_any(self: std::sync::Arc<Self>) -> std::sync::Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    fn instance_id(&self) -> u64 {
        self.kernel.id()
    }

    fn is_shutdown(&self) -> bool {
        self.kernel.is_shutdown()
    }

    async fn checkup(&self, probe: &mut Probe) -> Result<(), CompError> {
        self.kernel.checkup()?;

        let expected = self.expected_names();
        self.kids.shutdown_unknowns(&expected).await;

        let mut first_err = None;
        for spec in &self.children {
            yield_now().await;
            if let Err(e) = self.kids.check_child(&spec.name, probe).await {
                if spec.is_temporary() {
                    debug!(container = %self.kernel.name(), child = %spec.name, error = %e,
                           "temporary child failed; exempt from cascade");
                    continue;
                }
                first_err = Some(e);
                break;
            }
        }
        let Some(err) = first_err else {
            return Ok(());
        };
        if probe.do_not_restart {
            return Err(err);
        }

        match self.restart_all().await {
            Ok(()) => {
                probe.restart_all = true;
                self.kids
                    .ctx()
                    .bus()
                    .publish(Event::now(EventKind::AllRestarted).with_comp(self.kernel.name()));
                Ok(())
            }
            Err(cycle_err) => {
                debug!(container = %self.kernel.name(), error = %cycle_err,
                       "one-for-all cycle failed; shutting container down");
                let _ = self.shutdown().await;
                Err(err)
            }
        }
    }

    async fn shutdown(&self) -> Result<(), CompError> {
        // Everything present but not expected goes first (adopted entries
        // included; the sweep exemption does not survive a teardown), then
        // the expected children in reverse declaration order.
        let expected = self.expected_names();
        let strays: Vec<String> = self
            .kids
            .ctx()
            .names()
            .into_iter()
            .filter(|n| !expected.contains(n.as_str()))
            .collect();
        for name in strays {
            yield_now().await;
            if let Err(e) = self.kids.shutdown_child(&name).await {
                debug!(container = %self.kernel.name(), child = %name, error = %e,
                       "unknown child failed to shut down");
            }
        }
        for spec in self.children.iter().rev() {
            yield_now().await;
            if let Err(e) = self.kids.shutdown_child(&spec.name).await {
                debug!(container = %self.kernel.name(), child = %spec.name, error = %e,
                       "child failed to shut down");
            }
        }
        self.kernel.shutdown()
    }
}
