//! # Error types used by the compvisor runtime and components.
//!
//! This module defines two main error enums:
//!
//! - [`SpecError`] errors raised while resolving or validating a description,
//!   before any component is instantiated.
//! - [`CompError`] errors raised by the live tree: loading, health checks,
//!   restarts, transactions, and supervisor escalation.
//!
//! Both types provide `as_label` for logs/metrics. [`CompError`] has
//! additional methods: `is_retryable()` and `is_fatal()`.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the description engine.
///
/// These are construction-time failures: a malformed description fails fast,
/// before any component of the affected subtree is instantiated.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// A component spec carries an empty name.
    #[error("component name is empty")]
    EmptyName,

    /// A component spec uses a name reserved by the context.
    #[error("component name '{name}' is reserved")]
    ReservedName {
        /// The offending name.
        name: String,
    },

    /// A resolved spec has no module path.
    #[error("component '{name}' has no module")]
    MissingModule {
        /// Name of the component without a module.
        name: String,
    },

    /// Two children of the same parent share a name.
    #[error("duplicate child '{name}' under '{parent}'")]
    DuplicateChild {
        /// Parent component name.
        parent: String,
        /// The duplicated child name.
        name: String,
    },

    /// A delta tried to rename a spec without `override_name`.
    #[error("cannot rename '{template}' to '{delta}' without name override")]
    NameMismatch {
        /// Name in the template.
        template: String,
        /// Name in the delta.
        delta: String,
    },

    /// A `$._.env.` link names a key absent from the top-level env.
    #[error("env link '{key}' not found in top-level env")]
    MissingLink {
        /// The missing key.
        key: String,
    },

    /// A `$._.env.` link resolved to a value that is itself a link.
    #[error("env link '{key}' resolves to another link")]
    ChainedLink {
        /// The offending key.
        key: String,
    },

    /// A description name does not end with `.json`.
    #[error("description '{name}' must end with .json")]
    NotJson {
        /// The offending artifact name.
        name: String,
    },

    /// A description failed to parse or is structurally invalid.
    #[error("description '{name}' is malformed: {reason}")]
    Malformed {
        /// The artifact or component name.
        name: String,
        /// Human-readable parse/validation failure.
        reason: String,
    },
}

impl SpecError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SpecError::EmptyName => "spec_empty_name",
            SpecError::ReservedName { .. } => "spec_reserved_name",
            SpecError::MissingModule { .. } => "spec_missing_module",
            SpecError::DuplicateChild { .. } => "spec_duplicate_child",
            SpecError::NameMismatch { .. } => "spec_name_mismatch",
            SpecError::MissingLink { .. } => "spec_missing_link",
            SpecError::ChainedLink { .. } => "spec_chained_link",
            SpecError::NotJson { .. } => "spec_not_json",
            SpecError::Malformed { .. } => "spec_malformed",
        }
    }
}

/// # Errors produced by the live tree.
///
/// Signalled by loaders, kernels, containers, and the supervisor. Some are
/// retryable under the owning container's policy (`MissingChild`,
/// `Shutdown`, `FactoryFailed`, `Timeout`), others are terminal.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompError {
    /// The description engine rejected a spec.
    #[error("invalid spec: {0}")]
    Spec(#[from] SpecError),

    /// An operation reached a component that is already shut down.
    #[error("component '{name}' is shut down")]
    Shutdown {
        /// Name of the shut-down component.
        name: String,
    },

    /// An expected child is not present in the children context.
    #[error("child '{name}' is missing")]
    MissingChild {
        /// Name of the missing child.
        name: String,
    },

    /// The loader exhausted its resolver sequence.
    #[error("artifact '{name}' not found (resolvers tried: {resolvers:?})")]
    ArtifactNotFound {
        /// The requested artifact name.
        name: String,
        /// Ids of the resolvers that were tried, in order.
        resolvers: Vec<String>,
    },

    /// A `#`-accessor walk did not end at a factory.
    #[error("module path '{path}' has no factory at '{accessor}'")]
    BadModulePath {
        /// The full module path.
        path: String,
        /// The accessor segment that failed.
        accessor: String,
    },

    /// A factory returned an application-level error.
    #[error("factory for '{name}' failed: {reason}")]
    FactoryFailed {
        /// Name of the component being created.
        name: String,
        /// The factory's own failure description.
        reason: String,
    },

    /// A factory panicked while constructing a component.
    ///
    /// This is the analog of an exception thrown across the async boundary;
    /// it is never retried blindly by the loader itself.
    #[error("factory for '{name}' panicked: {info}")]
    FactoryPanicked {
        /// Name of the component being created.
        name: String,
        /// Formatted panic payload.
        info: String,
    },

    /// A bounded retry gave up; carries the last underlying error.
    #[error("gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Total attempts made (initial try included).
        attempts: u32,
        /// The error from the final attempt.
        last: Box<CompError>,
    },

    /// A deadline wrapper fired before the wrapped operation completed.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The configured deadline.
        timeout: Duration,
    },

    /// The supervisor observed a still-in-progress health check.
    #[error("health check still in progress ({overlaps} overlapping ticks)")]
    Hang {
        /// Consecutive ticks that found the previous one pending.
        overlaps: u32,
    },

    /// The supervisor decided to terminate.
    #[error("fatal: {reason}")]
    Fatal {
        /// Why the tree is going down.
        reason: String,
    },

    /// A transactional commit failed after the checkpoint was prepared.
    ///
    /// Unrecoverable for this component: the platform must shut it down and
    /// rely on `resume` to retry the deferred (idempotent) operations.
    #[error("commit failed for '{name}': {reason}")]
    CommitFailed {
        /// Name of the transactional component.
        name: String,
        /// The underlying failure.
        reason: String,
    },

    /// Application-level failure reported by a component implementation.
    #[error("{reason}")]
    App {
        /// The component's own failure description.
        reason: String,
    },
}

impl CompError {
    /// Convenience constructor for application-level failures.
    pub fn app(reason: impl Into<String>) -> Self {
        CompError::App {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            CompError::Spec(_) => "comp_invalid_spec",
            CompError::Shutdown { .. } => "comp_shutdown",
            CompError::MissingChild { .. } => "comp_missing_child",
            CompError::ArtifactNotFound { .. } => "comp_artifact_not_found",
            CompError::BadModulePath { .. } => "comp_bad_module_path",
            CompError::FactoryFailed { .. } => "comp_factory_failed",
            CompError::FactoryPanicked { .. } => "comp_factory_panicked",
            CompError::RetryExhausted { .. } => "comp_retry_exhausted",
            CompError::Timeout { .. } => "comp_timeout",
            CompError::Hang { .. } => "comp_hang",
            CompError::Fatal { .. } => "comp_fatal",
            CompError::CommitFailed { .. } => "comp_commit_failed",
            CompError::App { .. } => "comp_app",
        }
    }

    /// Indicates whether another attempt can change the outcome.
    ///
    /// Consulted by [`RetryPolicy::run`](crate::RetryPolicy::run): a
    /// non-retryable error (a rejected spec, a panicked factory, an
    /// exhausted inner retry) aborts the loop without burning the
    /// remaining attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompError::Shutdown { .. }
                | CompError::MissingChild { .. }
                | CompError::FactoryFailed { .. }
                | CompError::Timeout { .. }
                | CompError::App { .. }
        )
    }

    /// Indicates whether the error is terminal for the whole subtree.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CompError::Fatal { .. } | CompError::CommitFailed { .. }
        )
    }

    /// True if this error came from the deadline wrapper.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CompError::Timeout { .. })
    }
}
