//! # Transactional container: two-phase commit over a component subtree.
//!
//! A [`TransactionalContainer`] extends the static container with the
//! `begin → prepare → (commit | abort)` protocol, applied to the subset of
//! children that expose [`Transactional`], in declaration order for every
//! phase.
//!
//! Besides its children, the container owns:
//! - `state`: a JSON snapshot of the component's own data (`null` default),
//! - a string backup of `state` taken at `begin` so `abort` can restore it,
//! - a lazy [`Action`] log: operations deferred until commit, replayed
//!   against a configurable [`ApplyAction`] target.
//!
//! ## Checkpoint shape
//! `prepare` combines the children's fragments into one JSON object keyed
//! by child name, attaching `state` (when non-null) and `log_actions`
//! (when non-empty). The platform persists this object before committing;
//! `resume` consumes it after a restart.
//!
//! ## Rules
//! - An error during `commit` is unrecoverable for this component: shut it
//!   down and rely on `resume` to retry the deferred operations.
//! - Deferred operations MUST be idempotent.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::yield_now;

use crate::context::ContextRef;
use crate::description::ComponentSpec;
use crate::errors::CompError;

use super::container::Container;
use super::kernel::{Component, Probe};

/// Checkpoint key carrying the container's own state.
pub const CP_STATE: &str = "state";
/// Checkpoint key carrying the deferred action log.
pub const CP_LOG: &str = "log_actions";

/// A deferred operation: a method name and its JSON arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Method to invoke on the action target.
    pub method: String,
    /// JSON arguments handed to the method.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Action {
    /// Builds an action.
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// Receiver of replayed [`Action`]s.
///
/// The owning component implements this and dispatches on
/// [`Action::method`]; replayed methods must be idempotent.
#[async_trait]
pub trait ApplyAction: Send + Sync + 'static {
    /// Applies one deferred action.
    async fn apply(&self, action: &Action) -> Result<(), CompError>;
}

/// Two-phase-commit participant.
///
/// Implemented by [`TransactionalContainer`] and by any component that
/// wants to take part in its parent's transactions. Containers nest: a
/// transactional container inside another contributes its whole combined
/// checkpoint as one fragment.
#[async_trait]
pub trait Transactional: Component {
    /// Clears transaction state at tree construction.
    async fn init(&self) -> Result<(), CompError>;

    /// Re-applies a previously prepared checkpoint after a restart.
    async fn resume(&self, cp: &Value) -> Result<(), CompError>;

    /// Opens a transaction.
    async fn begin(&self, msg: &Value) -> Result<(), CompError>;

    /// Produces this participant's checkpoint fragment.
    async fn prepare(&self) -> Result<Value, CompError>;

    /// Makes the transaction durable.
    async fn commit(&self) -> Result<(), CompError>;

    /// Rolls the transaction back.
    async fn abort(&self) -> Result<(), CompError>;
}

/// Static container with two-phase commit and a lazy action log.
pub struct TransactionalContainer {
    container: Container,
    state: RwLock<Value>,
    backup: RwLock<Option<String>>,
    log: RwLock<Vec<Action>>,
    target: RwLock<Option<Weak<dyn ApplyAction>>>,
}

impl TransactionalContainer {
    /// Validates the spec and builds the container with `null` state and an
    /// empty log.
    pub fn new(ctx: &ContextRef, spec: ComponentSpec) -> Result<Self, CompError> {
        Ok(Self {
            container: Container::new(ctx, spec)?,
            state: RwLock::new(Value::Null),
            backup: RwLock::new(None),
            log: RwLock::new(Vec::new()),
            target: RwLock::new(None),
        })
    }

    /// The underlying static container.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Returns a clone of the component's own state.
    pub fn state(&self) -> Value {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the component's own state.
    pub fn set_state(&self, v: Value) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = v;
    }

    /// Sets the object deferred actions are replayed against.
    ///
    /// Usually the owning component, registered right after construction.
    pub fn set_action_target(&self, target: Weak<dyn ApplyAction>) {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = Some(target);
    }

    /// Defers an operation until commit (or resume-replay).
    pub fn lazy_apply(&self, action: Action) {
        self.log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
    }

    /// Returns a snapshot of the pending action log.
    pub fn pending_actions(&self) -> Vec<Action> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear_log(&self) {
        self.log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn set_log(&self, actions: Vec<Action>) {
        *self.log.write().unwrap_or_else(PoisonError::into_inner) = actions;
    }

    /// Transactional children in declaration order.
    fn transactional_children(&self) -> Vec<(String, Arc<dyn Transactional>)> {
        let ctx = self.container.children_ctx();
        self.container
            .children()
            .iter()
            .filter_map(|spec| {
                ctx.lookup(&spec.name)
                    .and_then(|c| c.as_transactional())
                    .map(|t| (spec.name.clone(), t))
            })
            .collect()
    }

    /// Replays the pending log against the action target, in order,
    /// stopping at the first error. Clears the log on success.
    async fn replay_log(&self) -> Result<(), CompError> {
        let actions = self.pending_actions();
        if actions.is_empty() {
            return Ok(());
        }
        let target = self
            .target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| CompError::app("no action target installed"))?;
        for action in &actions {
            yield_now().await;
            target.apply(action).await?;
        }
        self.clear_log();
        Ok(())
    }
}

#[async_trait]
impl Component for TransactionalContainer {
    fn spec(&self) -> &ComponentSpec {
        self.container.spec()
    }

    fn instance_id(&self) -> u64 {
        self.container.instance_id()
    }

    fn is_shutdown(&self) -> bool {
        self.container.is_shutdown()
    }

    async fn checkup(&self, probe: &mut Probe) -> Result<(), CompError> {
        self.container.checkup(probe).await
    }

    async fn shutdown(&self) -> Result<(), CompError> {
        self.container.shutdown().await
    }

    fn as_transactional(self: Arc<Self>) -> Option<Arc<dyn Transactional>> {
        Some(self)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }
}

#[async_trait]
impl Transactional for TransactionalContainer {
    async fn init(&self) -> Result<(), CompError> {
        self.clear_log();
        for (_, child) in self.transactional_children() {
            yield_now().await;
            child.init().await?;
        }
        Ok(())
    }

    async fn resume(&self, cp: &Value) -> Result<(), CompError> {
        for (name, child) in self.transactional_children() {
            yield_now().await;
            let fragment = cp.get(&name).cloned().unwrap_or(Value::Null);
            child.resume(&fragment).await?;
        }
        if let Some(state) = cp.get(CP_STATE) {
            self.set_state(state.clone());
        }
        if let Some(log) = cp.get(CP_LOG) {
            let actions: Vec<Action> =
                serde_json::from_value(log.clone()).map_err(|e| CompError::App {
                    reason: format!("bad checkpoint log: {e}"),
                })?;
            self.set_log(actions);
        }
        self.replay_log().await
    }

    async fn begin(&self, msg: &Value) -> Result<(), CompError> {
        let snapshot = serde_json::to_string(&self.state()).map_err(|e| CompError::App {
            reason: format!("cannot snapshot state: {e}"),
        })?;
        *self.backup.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        self.clear_log();

        for (_, child) in self.transactional_children() {
            yield_now().await;
            child.begin(msg).await?;
        }
        Ok(())
    }

    async fn prepare(&self) -> Result<Value, CompError> {
        let mut cp = Map::new();
        for (name, child) in self.transactional_children() {
            yield_now().await;
            cp.insert(name, child.prepare().await?);
        }
        let state = self.state();
        if !state.is_null() {
            cp.insert(CP_STATE.to_string(), state);
        }
        let actions = self.pending_actions();
        if !actions.is_empty() {
            cp.insert(
                CP_LOG.to_string(),
                serde_json::to_value(actions).map_err(|e| CompError::App {
                    reason: format!("cannot serialize action log: {e}"),
                })?,
            );
        }
        Ok(Value::Object(cp))
    }

    async fn commit(&self) -> Result<(), CompError> {
        let fail = |reason: String| CompError::CommitFailed {
            name: self.container.spec().name.clone(),
            reason,
        };
        for (_, child) in self.transactional_children() {
            yield_now().await;
            child.commit().await.map_err(|e| fail(e.to_string()))?;
        }
        self.replay_log().await.map_err(|e| fail(e.to_string()))
    }

    async fn abort(&self) -> Result<(), CompError> {
        let snapshot = self
            .backup
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(raw) = snapshot {
            let restored = serde_json::from_str(&raw).map_err(|e| CompError::App {
                reason: format!("cannot restore state backup: {e}"),
            })?;
            self.set_state(restored);
        }
        self.clear_log();

        for (_, child) in self.transactional_children() {
            yield_now().await;
            child.abort().await?;
        }
        Ok(())
    }
}
