//! # The component context (`$`).
//!
//! A [`Context`] is the parent-provided mapping from child name to live
//! component. Every container creates one child context; every component
//! holds the context it lives in. These two relations form the supervision
//! tree: ownership follows the `components` arrays, navigation goes through
//! the shared tree cell.
//!
//! The reserved bindings of the source model are dedicated fields here
//! rather than magic map keys:
//! - the **root back-reference** (`_`) is a non-owning `Weak` to the
//!   top-level supervisor, shared by every context of the tree;
//! - the **loader** handle is installed once at launch and visible from
//!   every layer;
//! - a clone of the event **bus** rides along so containers can publish
//!   lifecycle events without holding a component reference.
//!
//! ## Rules
//! - The map is written only by the owning parent (and the loader acting on
//!   its behalf); children never mutate sibling bindings.
//! - Deregistration is identity-checked: a binding is removed only if it
//!   still points at the exact instance being shut down, so a replacement
//!   child is never unbound by its predecessor's late shutdown.

use std::sync::{Arc, RwLock, Weak};

use dashmap::DashMap;

use crate::components::{Component, ComponentRef};
use crate::errors::CompError;
use crate::events::Bus;
use crate::loader::Loader;

/// Shared handle to a context.
pub type ContextRef = Arc<Context>;

/// State shared by every context of one tree.
struct TreeCell {
    root: RwLock<Option<Weak<dyn Component>>>,
    loader: RwLock<Option<Arc<Loader>>>,
    bus: Bus,
}

/// A mutable mapping from component name to live component, plus the shared
/// tree cell (root back-reference, loader, bus).
pub struct Context {
    entries: DashMap<String, ComponentRef>,
    cell: Arc<TreeCell>,
}

impl Context {
    /// Creates the top-level context of a fresh tree.
    pub fn new_root(bus: Bus) -> ContextRef {
        Arc::new(Self {
            entries: DashMap::new(),
            cell: Arc::new(TreeCell {
                root: RwLock::new(None),
                loader: RwLock::new(None),
                bus,
            }),
        })
    }

    /// Creates a child context sharing this tree's cell.
    pub fn child(&self) -> ContextRef {
        Arc::new(Self {
            entries: DashMap::new(),
            cell: Arc::clone(&self.cell),
        })
    }

    /// Binds `name` to `comp`, replacing any previous binding.
    pub fn register(&self, name: impl Into<String>, comp: ComponentRef) {
        self.entries.insert(name.into(), comp);
    }

    /// Returns the component bound to `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<ComponentRef> {
        self.entries.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Removes the binding for `name` only if it still points at the
    /// instance with id `id`. Returns whether a binding was removed.
    pub fn deregister_if(&self, name: &str, id: u64) -> bool {
        self.entries
            .remove_if(name, |_, c| c.instance_id() == id)
            .is_some()
    }

    /// Returns the currently bound names.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Returns a snapshot of all bindings.
    pub fn components(&self) -> Vec<(String, ComponentRef)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no component is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets the tree-wide root back-reference. Called once at launch.
    pub fn set_tree_root(&self, comp: &ComponentRef) {
        if let Ok(mut slot) = self.cell.root.write() {
            *slot = Some(Arc::downgrade(comp));
        }
    }

    /// Returns the top-level component of the tree, if still alive.
    pub fn tree_root(&self) -> Option<ComponentRef> {
        self.cell
            .root
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().and_then(Weak::upgrade))
    }

    /// Installs the loader handle. Called once at launch.
    pub fn set_loader(&self, loader: Arc<Loader>) {
        if let Ok(mut slot) = self.cell.loader.write() {
            *slot = Some(loader);
        }
    }

    /// Returns the tree's loader.
    pub fn loader(&self) -> Result<Arc<Loader>, CompError> {
        self.cell
            .loader
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or_else(|| CompError::app("no loader installed in this tree"))
    }

    /// Returns the tree's event bus.
    pub fn bus(&self) -> &Bus {
        &self.cell.bus
    }
}
