//! # The loader: artifact resolution, description loading, component
//! construction.
//!
//! The loader is the single gate between declarative descriptions and live
//! components. It owns an ordered resolver sequence, a static-artifact
//! override table, a cache of parsed descriptions, and a module-index map
//! recording which resolver supplied each artifact.
//!
//! ## Resolution order
//! ```text
//! load_artifact(name)
//!   → static table
//!   → resolvers, in sequence (first hit wins)
//!   → default resolver
//!   → ArtifactNotFound { resolvers tried }
//! ```
//!
//! ## Component construction
//! ```text
//! load_component($, spec)
//!   → resolve spec.module (pkg#ns#factory) to a Factory
//!   → invoke the factory under catch_unwind (panic → FactoryPanicked)
//!   → checkup the fresh component
//!   → register $[spec.name] = comp   (only after both succeed)
//! ```
//!
//! ## Rules
//! - Errors bubble as values; the loader never unwinds across an await.
//! - A Rust future completes at most once, so the legacy double-completion
//!   defence reduces to the panic containment above.
//! - `set_resolvers` clears the description cache.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::components::{Component, ComponentRef, Probe};
use crate::context::ContextRef;
use crate::description::{merge, resolve_env, resolve_links, ComponentSpec, SpecDelta};
use crate::errors::{CompError, SpecError};
use crate::util::panic_message;

use super::artifact::{Artifact, Entry, Factory, Resolver, FACTORY_SYMBOL};

/// Resolves artifacts, descriptions, and components for one tree.
pub struct Loader {
    resolvers: RwLock<Vec<Arc<dyn Resolver>>>,
    default_resolver: RwLock<Option<Arc<dyn Resolver>>>,
    statics: RwLock<HashMap<String, Artifact>>,
    cache: RwLock<HashMap<String, Value>>,
    index: RwLock<HashMap<String, String>>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Creates a loader with no resolvers installed.
    pub fn new() -> Self {
        Self {
            resolvers: RwLock::new(Vec::new()),
            default_resolver: RwLock::new(None),
            statics: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the resolver sequence and clears the description cache.
    pub fn set_resolvers(&self, seq: Vec<Arc<dyn Resolver>>) {
        *self
            .resolvers
            .write()
            .unwrap_or_else(PoisonError::into_inner) = seq;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Installs the resolver of last resort.
    pub fn set_default_resolver(&self, r: Arc<dyn Resolver>) {
        *self
            .default_resolver
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(r);
    }

    /// Installs a table that bypasses resolution entirely.
    ///
    /// Returns the previous table.
    pub fn set_static_artifacts(
        &self,
        map: HashMap<String, Artifact>,
    ) -> HashMap<String, Artifact> {
        let mut statics = self.statics.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *statics, map)
    }

    /// Reports which resolver supplied `artifact`, if it has been loaded.
    pub fn resolved_by(&self, artifact: &str) -> Option<String> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(artifact)
            .cloned()
    }

    /// Locates an artifact: static table, then each resolver in order, then
    /// the default resolver.
    pub fn load_artifact(&self, name: &str) -> Result<Artifact, CompError> {
        if let Some(a) = self
            .statics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(a.clone());
        }

        let resolvers: Vec<Arc<dyn Resolver>> = self
            .resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let default = self
            .default_resolver
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut tried = Vec::new();
        for r in resolvers.into_iter().chain(default) {
            if let Some(a) = r.resolve(name) {
                self.index
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.to_string(), r.id().to_string());
                return Ok(a);
            }
            tried.push(r.id().to_string());
        }
        Err(CompError::ArtifactNotFound {
            name: name.to_string(),
            resolvers: tried,
        })
    }

    /// Loads a raw (unresolved) parsed description by file name.
    ///
    /// The name must end with `.json`; leading `./` segments are stripped.
    /// Successful loads are cached until the resolver sequence changes.
    pub fn load_raw_description(&self, name: &str) -> Result<Value, CompError> {
        if !name.ends_with(".json") {
            return Err(SpecError::NotJson {
                name: name.to_string(),
            }
            .into());
        }
        let name = normalize(name);

        if let Some(v) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(v.clone());
        }

        match self.load_artifact(name)? {
            Artifact::Description(v) => {
                self.cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.to_string(), v.clone());
                Ok(v)
            }
            Artifact::Module(_) => Err(SpecError::Malformed {
                name: name.to_string(),
                reason: "artifact is a module, not a description".to_string(),
            }
            .into()),
        }
    }

    /// Loads and fully resolves a description.
    ///
    /// Layering, in order: base document, sibling `<base>++.json` delta
    /// (absence is not an error), caller-supplied override (which may
    /// rename the root), environment substitution, top-env linking,
    /// validation.
    pub fn load_description(
        &self,
        name: &str,
        spec_override: Option<&SpecDelta>,
    ) -> Result<ComponentSpec, CompError> {
        let raw = self.load_raw_description(name)?;
        let mut spec = ComponentSpec::from_value(raw)?;

        match self.load_raw_description(&delta_name(normalize(name))) {
            Ok(v) => {
                let delta = SpecDelta::from_value(v)?;
                spec = merge(&spec, &delta, false)?;
            }
            Err(CompError::ArtifactNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        if let Some(ov) = spec_override {
            spec = merge(&spec, ov, true)?;
        }

        resolve_env(&mut spec);
        resolve_links(&mut spec)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Constructs the component described by `spec` and registers it in
    /// `ctx` under its name.
    ///
    /// The factory future runs under `catch_unwind`: a panic surfaces as
    /// [`CompError::FactoryPanicked`] instead of tearing the caller down.
    /// The fresh component must pass a checkup before registration; on any
    /// failure nothing is registered.
    pub async fn load_component(
        &self,
        ctx: &ContextRef,
        spec: &ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        let path = spec.module.as_deref().ok_or_else(|| SpecError::MissingModule {
            name: spec.name.clone(),
        })?;
        let factory = self.resolve_factory(path)?;

        let fut = factory.new_instance(ctx, spec.clone());
        let comp = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(c)) => c,
            Ok(Err(e)) => {
                debug!(comp = %spec.name, error = %e, "factory failed");
                return Err(e);
            }
            Err(payload) => {
                return Err(CompError::FactoryPanicked {
                    name: spec.name.clone(),
                    info: panic_message(payload.as_ref()),
                })
            }
        };

        let mut probe = Probe::default();
        comp.checkup(&mut probe).await?;
        ctx.register(spec.name.clone(), Arc::clone(&comp));
        Ok(comp)
    }

    /// Walks a `pkg#ns#factory` path down to a factory.
    fn resolve_factory(&self, path: &str) -> Result<Arc<dyn Factory>, CompError> {
        let bad = |accessor: &str| CompError::BadModulePath {
            path: path.to_string(),
            accessor: accessor.to_string(),
        };

        let mut parts = path.split('#');
        let artifact_name = parts.next().unwrap_or_default();
        let mut module = match self.load_artifact(artifact_name)? {
            Artifact::Module(m) => m,
            Artifact::Description(_) => return Err(bad(artifact_name)),
        };

        let accessors: Vec<&str> = parts.collect();
        let Some((last, inner)) = accessors.split_last() else {
            return module.factory(FACTORY_SYMBOL).ok_or_else(|| bad(FACTORY_SYMBOL));
        };
        for acc in inner {
            let next = match module.get(acc) {
                Some(Entry::Module(m)) => Arc::clone(m),
                _ => return Err(bad(acc)),
            };
            module = next;
        }
        match module.get(last) {
            Some(Entry::Factory(f)) => Ok(Arc::clone(f)),
            Some(Entry::Module(m)) => m.factory(FACTORY_SYMBOL).ok_or_else(|| bad(FACTORY_SYMBOL)),
            None => Err(bad(last)),
        }
    }
}

/// Strips leading `./` segments.
fn normalize(name: &str) -> &str {
    let mut name = name;
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name
}

/// `hello.json` → `hello++.json`.
fn delta_name(base: &str) -> String {
    let stem = base.strip_suffix(".json").unwrap_or(base);
    format!("{stem}++.json")
}
