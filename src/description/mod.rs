//! # Description engine: model, merge, and resolution.
//!
//! A component tree is described declaratively as JSON. Three layered
//! sources combine into one resolved [`ComponentSpec`]:
//!
//! ```text
//! base template ⊕ sibling delta (<base>++.json) ⊕ caller override
//!     → resolve_env   (process.env.NAME||default)
//!     → resolve_links ($._.env.key against the root env)
//!     → validate      (names, modules, duplicates)
//! ```
//!
//! The merge never mutates its inputs, and both resolution walks are
//! idempotent.

mod merge;
mod model;
mod resolve;

pub use merge::merge;
pub use model::{ComponentSpec, SpecDelta, ENV_ADOPTED, ENV_TEMPORARY, RESERVED_NAMES};
pub use resolve::{resolve_env, resolve_links, ENV_VAR_PREFIX, TOP_LINK_PREFIX};
