//! # Builtin module table.
//!
//! Stock factories for the generic kernels, so descriptions can nest plain
//! containers without any custom code:
//!
//! - `std#container` — static one-for-all [`Container`]
//! - `std#dynamic` — one-for-one [`DynamicContainer`]
//! - `std#transactional` — two-phase-commit [`TransactionalContainer`]
//!
//! [`resolver`] wraps the table as the loader's resolver of last resort.

use std::sync::Arc;

use async_trait::async_trait;

use crate::components::{ComponentRef, Container, DynamicContainer, TransactionalContainer};
use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;

use super::artifact::{Factory, Module, ModuleRef, Resolver, TableResolver};

/// Artifact name the builtin module is registered under.
pub const BUILTIN_ARTIFACT: &str = "std";

struct ContainerFactory;

#[async_trait]
impl Factory for ContainerFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        Ok(Arc::new(Container::new(ctx, spec)?))
    }
}

struct DynamicFactory;

#[async_trait]
impl Factory for DynamicFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        Ok(Arc::new(DynamicContainer::new(ctx, spec)?))
    }
}

struct TransactionalFactory;

#[async_trait]
impl Factory for TransactionalFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        Ok(Arc::new(TransactionalContainer::new(ctx, spec)?))
    }
}

/// The builtin module table.
pub fn module() -> ModuleRef {
    Module::new()
        .with_factory("container", Arc::new(ContainerFactory))
        .with_factory("dynamic", Arc::new(DynamicFactory))
        .with_factory("transactional", Arc::new(TransactionalFactory))
        .into_ref()
}

/// A resolver exposing the builtin table under [`BUILTIN_ARTIFACT`].
///
/// Installed by the builder as the loader's default resolver.
pub fn resolver() -> Arc<dyn Resolver> {
    TableResolver::new("builtin")
        .with_module(BUILTIN_ARTIFACT, module())
        .into_arc()
}
