//! # Shared child-set engine.
//!
//! [`ChildSet`] owns a children context and implements the operations both
//! container flavors build on: health-check a child, shut one down, create
//! one through the loader, and the check-and-restart step that applies the
//! temporary-child and `do_not_restart` rules.
//!
//! ## Rules
//! - `create_child` shuts the name down first, so a half-alive predecessor
//!   can never coexist with its replacement.
//! - Creation and shutdown run under the container's [`RetryPolicy`];
//!   retries publish `RetryScheduled` events.
//! - `shutdown_child` on an absent name succeeds (idempotent).
//! - Sweeps yield cooperatively between children so large trees do not
//!   monopolise the event loop.

use std::collections::HashSet;

use tokio::task::yield_now;
use tracing::{debug, warn};

use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;
use crate::events::{Event, EventKind};
use crate::policies::RetryPolicy;

use super::kernel::{Component, ComponentRef, Probe};

/// Children context plus the recovery policy of the owning container.
pub(crate) struct ChildSet {
    owner: String,
    ctx: ContextRef,
    retry: RetryPolicy,
}

impl ChildSet {
    /// Creates the children context (`$.$`) under `parent_ctx`.
    pub fn new(parent_ctx: &ContextRef, owner: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            owner: owner.into(),
            ctx: parent_ctx.child(),
            retry,
        }
    }

    /// The children context.
    pub fn ctx(&self) -> &ContextRef {
        &self.ctx
    }

    /// Health-checks one child by name.
    ///
    /// Missing and shut-down children are errors so the caller's policy can
    /// decide on a restart.
    pub async fn check_child(&self, name: &str, probe: &mut Probe) -> Result<(), CompError> {
        match self.ctx.lookup(name) {
            None => Err(CompError::MissingChild {
                name: name.to_string(),
            }),
            Some(c) if c.is_shutdown() => Err(CompError::Shutdown {
                name: name.to_string(),
            }),
            Some(c) => c.checkup(probe).await,
        }
    }

    /// Health-checks `spec`'s child and restarts it on failure.
    ///
    /// Temporary children swallow their own failure (they are restarted by
    /// mechanisms outside this container, if at all); the `do_not_restart`
    /// hint turns the failure into an error instead of a restart.
    pub async fn check_and_restart_child(
        &self,
        spec: &ComponentSpec,
        probe: &mut Probe,
    ) -> Result<(), CompError> {
        let Err(err) = self.check_child(&spec.name, probe).await else {
            return Ok(());
        };
        if spec.is_temporary() {
            debug!(owner = %self.owner, child = %spec.name, error = %err,
                   "temporary child failed; not restarting");
            return Ok(());
        }
        if probe.do_not_restart {
            return Err(err);
        }
        self.create_child(spec).await.map(|_| ())
    }

    /// Shuts down one child by name. Absence is success.
    pub async fn shutdown_child(&self, name: &str) -> Result<(), CompError> {
        let Some(child) = self.ctx.lookup(name) else {
            return Ok(());
        };
        let bus = self.ctx.bus().clone();
        let owner = self.owner.clone();
        let delay = self.retry.delay;
        self.retry
            .run(|attempt| {
                let child = child.clone();
                let bus = bus.clone();
                let owner = owner.clone();
                async move {
                    if attempt > 1 {
                        bus.publish(
                            Event::now(EventKind::RetryScheduled)
                                .with_comp(owner)
                                .with_attempt(attempt)
                                .with_delay(delay),
                        );
                    }
                    child.shutdown().await
                }
            })
            .await?;
        self.ctx
            .bus()
            .publish(Event::now(EventKind::ChildShutdown).with_comp(name));
        Ok(())
    }

    /// Creates (or re-creates) a child from `spec` through the loader.
    ///
    /// Any previous holder of the name is shut down first. The loader call
    /// is retried under the container's policy; on success the child is
    /// registered in the children context.
    pub async fn create_child(&self, spec: &ComponentSpec) -> Result<ComponentRef, CompError> {
        self.shutdown_child(&spec.name).await?;

        let loader = self.ctx.loader()?;
        let bus = self.ctx.bus().clone();
        let ctx = self.ctx.clone();
        let delay = self.retry.delay;
        let comp = self
            .retry
            .run(|attempt| {
                let loader = loader.clone();
                let ctx = ctx.clone();
                let spec = spec.clone();
                let bus = bus.clone();
                async move {
                    if attempt > 1 {
                        bus.publish(
                            Event::now(EventKind::RetryScheduled)
                                .with_comp(spec.name.clone())
                                .with_attempt(attempt)
                                .with_delay(delay),
                        );
                    }
                    loader.load_component(&ctx, &spec).await
                }
            })
            .await?;
        self.ctx
            .bus()
            .publish(Event::now(EventKind::ChildCreated).with_comp(&spec.name));
        Ok(comp)
    }

    /// Names bound in the children context that the owner does not expect
    /// and that are not adopted.
    pub fn unknown_names(&self, expected: &HashSet<&str>) -> Vec<String> {
        self.ctx
            .components()
            .into_iter()
            .filter(|(name, comp)| {
                !expected.contains(name.as_str()) && !comp.spec().is_adopted()
            })
            .map(|(name, _)| name)
            .collect()
    }

    /// Shuts down every unknown child (no restart).
    pub async fn shutdown_unknowns(&self, expected: &HashSet<&str>) {
        for name in self.unknown_names(expected) {
            yield_now().await;
            warn!(owner = %self.owner, child = %name, "shutting down unknown child");
            if let Err(e) = self.shutdown_child(&name).await {
                debug!(owner = %self.owner, child = %name, error = %e,
                       "unknown child refused to shut down");
            }
        }
    }
}
