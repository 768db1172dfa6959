//! # Dynamic container: mutable membership, one-for-one supervision.
//!
//! A [`DynamicContainer`] manages a runtime-mutable set of children. Unlike
//! the static container, a failing child is restarted alone — siblings keep
//! running — and membership changes through [`instance_child`] /
//! [`delete_child`] instead of the spec.
//!
//! ## Serialization
//! Operations on a single child name are totally ordered: each call locks
//! one of a fixed set of shard locks chosen by a stable hash of the name,
//! with a repeat existence check under the lock. Independent names can make
//! progress concurrently at the I/O level; the same name never races
//! create against delete.
//!
//! ```text
//! instance_child("c") ──► shard[hash("c") % 47] ──► (locked) exists? reuse
//!                                                            absent? create
//! delete_child("c")   ──► same shard ──► (locked) unexpect + shutdown
//! ```
//!
//! ## Rules
//! - `instance_child` returns the existing child when the name is taken,
//!   even if its spec differs — callers that need a specific spec must
//!   `delete_child` first.
//! - A failed creation rolls the expected-set entry back only for
//!   temporary specs; persistent specs stay expected and are retried by
//!   the next checkup.
//! - Shutdown propagates to all present children with no ordering
//!   guarantee (dynamic children are independent).
//!
//! [`instance_child`]: DynamicContainer::instance_child
//! [`delete_child`]: DynamicContainer::delete_child

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::yield_now;
use tracing::debug;

use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;
use crate::policies::RetryPolicy;
use crate::util::stable_hash;

use super::children::ChildSet;
use super::kernel::{Component, ComponentRef, Kernel, Probe};

/// Number of serial shard locks for per-name ordering.
pub const QUEUE_SHARDS: usize = 47;

/// Dynamic container kernel with one-for-one supervision.
pub struct DynamicContainer {
    kernel: Kernel,
    kids: ChildSet,
    expected: RwLock<HashMap<String, ComponentSpec>>,
    shards: Vec<Mutex<()>>,
}

impl DynamicContainer {
    /// Validates the spec and builds the container.
    ///
    /// Children declared in the spec seed the expected set; the first
    /// checkup materialises them.
    pub fn new(ctx: &ContextRef, spec: ComponentSpec) -> Result<Self, CompError> {
        let retry = RetryPolicy::from_spec(&spec)?;
        let kernel = Kernel::new(ctx, spec)?;
        let kids = ChildSet::new(ctx, kernel.name().to_string(), retry);
        let expected = kernel
            .spec()
            .components
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect();
        Ok(Self {
            kernel,
            kids,
            expected: RwLock::new(expected),
            shards: (0..QUEUE_SHARDS).map(|_| Mutex::new(())).collect(),
        })
    }

    /// The children context (`$.$`).
    pub fn children_ctx(&self) -> &ContextRef {
        self.kids.ctx()
    }

    fn shard(&self, name: &str) -> &Mutex<()> {
        &self.shards[(stable_hash(name) % QUEUE_SHARDS as u64) as usize]
    }

    fn expect(&self, spec: ComponentSpec) {
        self.expected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(spec.name.clone(), spec);
    }

    fn unexpect(&self, name: &str) -> Option<ComponentSpec> {
        self.expected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    fn expected_specs(&self) -> Vec<ComponentSpec> {
        self.expected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Returns the expected spec recorded for `name`, if any.
    pub fn get_child_spec(&self, name: &str) -> Option<ComponentSpec> {
        self.expected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns all currently present children.
    pub fn all_children(&self) -> Vec<ComponentRef> {
        self.kids
            .ctx()
            .components()
            .into_iter()
            .map(|(_, c)| c)
            .collect()
    }

    /// Creates the child described by `spec`, or returns the existing
    /// holder of that name.
    ///
    /// Serialized per name through the shard locks; a repeat check under
    /// the lock prevents double-creation.
    pub async fn instance_child(&self, spec: ComponentSpec) -> Result<ComponentRef, CompError> {
        self.kernel.checkup()?;
        spec.validate()?;

        let _serial = self.shard(&spec.name).lock().await;
        if let Some(existing) = self.kids.ctx().lookup(&spec.name) {
            if !existing.is_shutdown() {
                return Ok(existing);
            }
        }
        self.create_child_locked(spec).await
    }

    /// Removes `name` from the expected set and shuts the child down.
    /// Idempotent: an absent name succeeds.
    pub async fn delete_child(&self, name: &str) -> Result<(), CompError> {
        let _serial = self.shard(name).lock().await;
        self.unexpect(name);
        self.kids.shutdown_child(name).await
    }

    /// Records the spec as expected and invokes the loader. Callers hold
    /// the name's shard lock.
    async fn create_child_locked(&self, spec: ComponentSpec) -> Result<ComponentRef, CompError> {
        let temporary = spec.is_temporary();
        let name = spec.name.clone();
        self.expect(spec.clone());

        match self.kids.create_child(&spec).await {
            Ok(c) => Ok(c),
            Err(e) => {
                if temporary {
                    self.unexpect(&name);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Component for DynamicContainer {
    fn spec(&self) -> &ComponentSpec {
        self.kernel.spec()
    }

    fn instance_id(&self) -> u64 {
        self.kernel.id()
    }

    fn is_shutdown(&self) -> bool {
        self.kernel.is_shutdown()
    }

    async fn checkup(&self, probe: &mut Probe) -> Result<(), CompError> {
        self.kernel.checkup()?;

        let specs = self.expected_specs();
        let expected = specs.iter().map(|c| c.name.as_str()).collect();
        self.kids.shutdown_unknowns(&expected).await;

        for spec in &specs {
            yield_now().await;
            let _serial = self.shard(&spec.name).lock().await;
            if self.get_child_spec(&spec.name).is_none() {
                // Deleted since the snapshot was taken.
                continue;
            }
            if let Err(e) = self.kids.check_and_restart_child(spec, probe).await {
                if probe.do_not_restart {
                    return Err(e);
                }
                debug!(container = %self.kernel.name(), child = %spec.name, error = %e,
                       "cannot reconcile child; shutting container down");
                let _ = self.shutdown().await;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), CompError> {
        let mut first_err = None;
        for (name, _) in self.kids.ctx().components() {
            yield_now().await;
            if let Err(e) = self.kids.shutdown_child(&name).await {
                debug!(container = %self.kernel.name(), child = %name, error = %e,
                       "child failed to shut down");
                first_err.get_or_insert(e);
            }
        }
        self.kernel.shutdown()?;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn as_any(self: std::sync::Arc<Self>) -> std::sync::Arc<dyn std::any::Any + Send + Sync> {
        self
    }
}
