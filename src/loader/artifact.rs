//! # Artifacts, module tables, resolvers, and the factory contract.
//!
//! A logical module path like `pkg#ns#factory` resolves in two steps: a
//! [`Resolver`] maps the leading artifact name (`pkg`) to an [`Artifact`],
//! and the `#`-separated accessor chain walks nested [`Module`] tables down
//! to a [`Factory`]. The well-known terminal symbol is
//! [`FACTORY_SYMBOL`] (`new_instance`): a path that ends at a module table
//! uses that entry.
//!
//! Descriptions are artifacts too: a `.json` name resolves to
//! [`Artifact::Description`] holding the parsed JSON document.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::components::ComponentRef;
use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;

/// Well-known name of a module's default factory entry.
pub const FACTORY_SYMBOL: &str = "new_instance";

/// Shared handle to a module table.
pub type ModuleRef = Arc<Module>;

/// Something a resolver can hand back for an artifact name.
#[derive(Clone)]
pub enum Artifact {
    /// A parsed JSON description document.
    Description(Value),
    /// A table of factories and nested modules.
    Module(ModuleRef),
}

/// One entry of a module table.
#[derive(Clone)]
pub enum Entry {
    /// A component factory.
    Factory(Arc<dyn Factory>),
    /// A nested module table.
    Module(ModuleRef),
}

/// A table of named factories and nested modules.
#[derive(Default)]
pub struct Module {
    entries: HashMap<String, Entry>,
}

impl Module {
    /// Creates an empty module table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory entry.
    pub fn with_factory(mut self, name: impl Into<String>, f: Arc<dyn Factory>) -> Self {
        self.entries.insert(name.into(), Entry::Factory(f));
        self
    }

    /// Adds a nested module entry.
    pub fn with_module(mut self, name: impl Into<String>, m: ModuleRef) -> Self {
        self.entries.insert(name.into(), Entry::Module(m));
        self
    }

    /// Finishes the builder into a shared handle.
    pub fn into_ref(self) -> ModuleRef {
        Arc::new(self)
    }

    /// Looks one entry up.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Looks a factory entry up by name.
    pub fn factory(&self, name: &str) -> Option<Arc<dyn Factory>> {
        match self.entries.get(name) {
            Some(Entry::Factory(f)) => Some(Arc::clone(f)),
            _ => None,
        }
    }
}

/// A platform-specific artifact lookup handle.
///
/// Resolvers are consulted in sequence; the first to return an artifact
/// wins. The `id` goes into `ArtifactNotFound` errors and the loader's
/// module-index map.
pub trait Resolver: Send + Sync + 'static {
    /// Stable identifier for diagnostics.
    fn id(&self) -> &str;

    /// Attempts to locate an artifact by logical name.
    fn resolve(&self, name: &str) -> Option<Artifact>;
}

/// In-memory table resolver.
///
/// The stock resolver for embedded deployments and tests: artifact names
/// map directly to modules and pre-parsed descriptions.
pub struct TableResolver {
    id: String,
    table: HashMap<String, Artifact>,
}

impl TableResolver {
    /// Creates an empty table resolver with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            table: HashMap::new(),
        }
    }

    /// Adds a parsed description under `name` (should end with `.json`).
    pub fn with_description(mut self, name: impl Into<String>, doc: Value) -> Self {
        self.table.insert(name.into(), Artifact::Description(doc));
        self
    }

    /// Adds a module table under `name`.
    pub fn with_module(mut self, name: impl Into<String>, m: ModuleRef) -> Self {
        self.table.insert(name.into(), Artifact::Module(m));
        self
    }

    /// Finishes the builder into a shared resolver handle.
    pub fn into_arc(self) -> Arc<dyn Resolver> {
        Arc::new(self)
    }
}

impl Resolver for TableResolver {
    fn id(&self) -> &str {
        &self.id
    }

    fn resolve(&self, name: &str) -> Option<Artifact> {
        self.table.get(name).cloned()
    }
}

/// The component factory contract.
///
/// Every loadable component exposes one of these; the loader invokes it
/// with the parent-provided context and the resolved spec. The returned
/// component must satisfy the [`Component`](crate::Component) kernel
/// contract; the loader health-checks it before registering.
#[async_trait]
pub trait Factory: Send + Sync + 'static {
    /// Asynchronously constructs a component from `spec` inside `ctx`.
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError>;
}
