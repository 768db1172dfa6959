//! The loader: resolver sequences, module tables, the factory contract,
//! and description/component loading.
//!
//! ## Files & responsibilities
//! - **artifact.rs**: [`Artifact`], [`Module`] tables, the [`Resolver`] and
//!   [`Factory`] contracts, the stock [`TableResolver`].
//! - **core.rs**: the [`Loader`] itself — resolution order, description
//!   cache, module-index, description layering, component construction.
//! - **builtin.rs**: stock factories for the generic kernels
//!   (`std#container`, `std#dynamic`, `std#transactional`).

pub mod builtin;

mod artifact;
mod core;

pub use artifact::{
    Artifact, Entry, Factory, Module, ModuleRef, Resolver, TableResolver, FACTORY_SYMBOL,
};
pub use core::Loader;
