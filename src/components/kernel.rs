//! # Component contract and the base kernel.
//!
//! Defines the core [`Component`] trait — the capability set every live
//! object in the tree exposes — and [`Kernel`], the base state bundle that
//! every concrete component embeds.
//!
//! Derived kernels (containers, the supervisor) embed their parent kernel
//! and explicitly chain to its methods when implementing their own; there
//! is no open recursion. A leaf component embeds [`Kernel`] directly:
//!
//! ```text
//! Supervisor ─embeds─► Container ─embeds─► Kernel
//! TransactionalContainer ─embeds─► Container ─embeds─► Kernel
//! DynamicContainer ──────embeds─────────────► Kernel
//! your leaf component ───embeds─────────────► Kernel
//! ```
//!
//! ## Rules
//! - `is_shutdown` is monotonic: once true, stays true.
//! - A successful shutdown deregisters the component from its context only
//!   if the binding still points at this exact instance.
//! - `checkup` on a shut-down component fails with
//!   [`CompError::Shutdown`].

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;

use super::transactional::Transactional;

/// Global counter for component instance identity.
static INSTANCE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a live component.
pub type ComponentRef = Arc<dyn Component>;

/// Mutable data threaded down a checkup traversal.
///
/// Carries the `do_not_restart` hint from the caller and collects the
/// `restart_all` annotation from any static container that completed a full
/// restart cycle, so observers can report it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Probe {
    /// When set, containers fail instead of restarting children.
    pub do_not_restart: bool,
    /// Set by a static container after a completed one-for-all cycle.
    pub restart_all: bool,
}

/// A live object in the supervision tree.
///
/// Every component is created by its parent container through the loader,
/// stays active until its parent shuts down (or a checkup replaces it), and
/// is reachable by name through its parent's children context.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Returns the immutable spec this component was built from.
    fn spec(&self) -> &ComponentSpec;

    /// Returns the unique id of this instance.
    ///
    /// Used for identity-checked deregistration; never reused within a
    /// process.
    fn instance_id(&self) -> u64;

    /// True once the component has been shut down.
    fn is_shutdown(&self) -> bool;

    /// Health-checks this component (and, for containers, its subtree).
    async fn checkup(&self, probe: &mut Probe) -> Result<(), CompError>;

    /// Irrevocably deactivates this component (and its subtree).
    ///
    /// Idempotent: a second call observes the same state and succeeds.
    async fn shutdown(&self) -> Result<(), CompError>;

    /// Downcast seam for two-phase-commit participants.
    fn as_transactional(self: Arc<Self>) -> Option<Arc<dyn Transactional>> {
        None
    }

    /// Downcast seam to the concrete component type.
    ///
    /// Lets a caller holding a [`ComponentRef`] recover the component's own
    /// API (`Arc::downcast` to the concrete type).
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Base state bundle embedded by every concrete component.
///
/// Owns the validated spec, the context the component lives in, the
/// monotonic shutdown flag, and the instance id.
pub struct Kernel {
    id: u64,
    spec: ComponentSpec,
    ctx: ContextRef,
    down: AtomicBool,
}

impl Kernel {
    /// Validates `spec` and builds the base kernel.
    pub fn new(ctx: &ContextRef, spec: ComponentSpec) -> Result<Self, CompError> {
        spec.validate()?;
        Ok(Self {
            id: INSTANCE_SEQ.fetch_add(1, Ordering::Relaxed),
            spec,
            ctx: Arc::clone(ctx),
            down: AtomicBool::new(false),
        })
    }

    /// The immutable spec.
    pub fn spec(&self) -> &ComponentSpec {
        &self.spec
    }

    /// The component's name (shorthand for `spec().name`).
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The unique instance id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The context this component lives in.
    pub fn ctx(&self) -> &ContextRef {
        &self.ctx
    }

    /// True once shut down.
    pub fn is_shutdown(&self) -> bool {
        self.down.load(Ordering::Acquire)
    }

    /// Base health check: fails once the component is shut down.
    pub fn checkup(&self) -> Result<(), CompError> {
        if self.is_shutdown() {
            return Err(CompError::Shutdown {
                name: self.spec.name.clone(),
            });
        }
        Ok(())
    }

    /// Base shutdown: flips the monotonic flag and deregisters this exact
    /// instance from its context. Always succeeds.
    pub fn shutdown(&self) -> Result<(), CompError> {
        self.down.store(true, Ordering::Release);
        self.ctx.deregister_if(&self.spec.name, self.id);
        Ok(())
    }
}
