//! # compvisor
//!
//! **Compvisor** is a component lifecycle and supervision framework.
//!
//! It builds a tree of asynchronously-constructed components from a
//! declarative JSON description, drives a periodic health check down the
//! tree, restarts failed subtrees under Erlang/OTP-style policies, and
//! escalates unrecoverable failures up to process exit.
//!
//! ## Features
//!
//! | Area             | Description                                                       | Key types / traits                            |
//! |------------------|-------------------------------------------------------------------|-----------------------------------------------|
//! | **Descriptions** | Template ⊕ delta merging, env substitution, top-env linking.      | [`ComponentSpec`], [`SpecDelta`], [`merge`]   |
//! | **Loading**      | Resolver sequences, module tables, async factories.               | [`Loader`], [`Resolver`], [`Factory`]         |
//! | **Kernels**      | Base component, static/dynamic/transactional containers.          | [`Component`], [`Container`], [`DynamicContainer`], [`TransactionalContainer`] |
//! | **Supervision**  | Periodic checkups, hang detection, cascading restarts, `die`.     | [`Supervisor`], [`Probe`]                     |
//! | **Events**       | Broadcast bus with per-subscriber fan-out workers.                | [`Bus`], [`Event`], [`Subscribe`]             |
//! | **Errors**       | Typed taxonomies for descriptions and the live tree.              | [`SpecError`], [`CompError`]                  |
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use compvisor::{Config, LogWriter, TableResolver, TreeBuilder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Descriptions are artifacts; this one nests a plain container.
//!     let resolver = TableResolver::new("app")
//!         .with_description("root.json", json!({
//!             "name": "root",
//!             "module": "supervisor",
//!             "env": {
//!                 "interval": 1000, "die_delay": -1, "max_hang_retries": 3,
//!                 "max_retries": 2, "retry_delay": 100
//!             },
//!             "components": [{
//!                 "name": "workers",
//!                 "module": "std#container",
//!                 "env": {"max_retries": 2, "retry_delay": 100}
//!             }]
//!         }))
//!         .into_arc();
//!
//!     let tree = TreeBuilder::new(Config::default())
//!         .with_resolvers(vec![resolver])
//!         .with_subscribers(vec![Arc::new(LogWriter)])
//!         .launch("root.json")
//!         .await?;
//!
//!     tree.start().await?; // first health check builds the tree
//!     tree.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod builder;
mod components;
mod config;
mod context;
mod description;
mod errors;
mod events;
mod loader;
mod policies;
mod subscribers;
mod supervisor;
mod util;

// ---- Public re-exports ----

pub use builder::{Tree, TreeBuilder};
pub use components::{
    Action, ApplyAction, Component, ComponentRef, Container, DynamicContainer, Kernel, Probe,
    Transactional, TransactionalContainer, CP_LOG, CP_STATE, QUEUE_SHARDS,
};
pub use config::Config;
pub use context::{Context, ContextRef};
pub use description::{
    merge, resolve_env, resolve_links, ComponentSpec, SpecDelta, ENV_ADOPTED, ENV_TEMPORARY,
    ENV_VAR_PREFIX, RESERVED_NAMES, TOP_LINK_PREFIX,
};
pub use errors::{CompError, SpecError};
pub use events::{Bus, Event, EventKind};
pub use loader::{
    builtin, Artifact, Entry, Factory, Loader, Module, ModuleRef, Resolver, TableResolver,
    FACTORY_SYMBOL,
};
pub use policies::{with_deadline, RetryPolicy, ENV_MAX_RETRIES, ENV_RETRY_DELAY};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use supervisor::{Supervisor, ENV_DIE_DELAY, ENV_INTERVAL, ENV_MAX_HANG_RETRIES};
pub use util::stable_hash;
