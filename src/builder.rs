//! # Tree assembly.
//!
//! [`TreeBuilder`] wires the runtime together the way the platform entry
//! point of the source system did: build the bus and subscriber fan-out,
//! install the loader, resolve the root description, construct the root
//! supervisor, and hand back a [`Tree`] handle.
//!
//! ```text
//! TreeBuilder::launch(name)
//!   ├─ Bus + SubscriberSet + fan-out listener
//!   ├─ root Context (bus riding in the tree cell)
//!   ├─ Loader (resolvers, statics, builtin default)
//!   ├─ load_description(name, override)   ← merge + env + links + validate
//!   ├─ Supervisor::new(ctx, spec)
//!   └─ register root binding + tree root back-reference
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::components::{Component, ComponentRef};
use crate::config::Config;
use crate::context::{Context, ContextRef};
use crate::description::SpecDelta;
use crate::errors::CompError;
use crate::events::{Bus, Event};
use crate::loader::{builtin, Artifact, Loader, Resolver};
use crate::policies::with_deadline;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::supervisor::Supervisor;

/// Builder for a supervision tree.
pub struct TreeBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    resolvers: Vec<Arc<dyn Resolver>>,
    statics: HashMap<String, Artifact>,
    override_delta: Option<SpecDelta>,
}

impl TreeBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            resolvers: Vec::new(),
            statics: HashMap::new(),
            override_delta: None,
        }
    }

    /// Sets event subscribers (the supervisor's notifier surface).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the loader's resolver sequence.
    pub fn with_resolvers(mut self, resolvers: Vec<Arc<dyn Resolver>>) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Installs static artifacts that bypass resolution.
    pub fn with_static_artifacts(mut self, statics: HashMap<String, Artifact>) -> Self {
        self.statics = statics;
        self
    }

    /// Sets the caller-supplied override delta (may rename the root).
    pub fn with_override(mut self, delta: SpecDelta) -> Self {
        self.override_delta = Some(delta);
        self
    }

    /// Resolves `desc_name` and constructs the (not yet started) tree.
    pub async fn launch(self, desc_name: &str) -> Result<Tree, CompError> {
        let bus = Bus::new(self.cfg.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let listener = spawn_fanout_listener(bus.subscribe(), Arc::clone(&subs));

        let ctx = Context::new_root(bus.clone());
        let loader = Arc::new(Loader::new());
        loader.set_resolvers(self.resolvers);
        loader.set_default_resolver(builtin::resolver());
        if !self.statics.is_empty() {
            loader.set_static_artifacts(self.statics);
        }
        ctx.set_loader(Arc::clone(&loader));

        let spec = loader.load_description(desc_name, self.override_delta.as_ref())?;
        let supervisor = Arc::new(Supervisor::new(&ctx, spec)?);
        let root: ComponentRef = supervisor.clone();
        ctx.register(root.spec().name.clone(), Arc::clone(&root));
        ctx.set_tree_root(&root);

        Ok(Tree {
            supervisor,
            ctx,
            bus,
            subs,
            listener,
            cfg: self.cfg,
        })
    }
}

/// Forwards bus events to the subscriber set; the single fan-out point.
fn spawn_fanout_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: Arc<SubscriberSet>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => subs.emit_arc(Arc::new(ev)),
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    })
}

/// A launched (and possibly running) supervision tree.
pub struct Tree {
    supervisor: Arc<Supervisor>,
    ctx: ContextRef,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    listener: JoinHandle<()>,
    cfg: Config,
}

impl Tree {
    /// The root supervisor.
    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// The top-level context (holds the root binding).
    pub fn context(&self) -> &ContextRef {
        &self.ctx
    }

    /// The root's children context — where the described components live.
    pub fn children(&self) -> &ContextRef {
        self.supervisor.container().children_ctx()
    }

    /// The tree's event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Subscribes a raw receiver to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Synchronous start: one health check now, then the timer.
    pub async fn start(&self) -> Result<(), CompError> {
        Arc::clone(&self.supervisor).start().await
    }

    /// Lazy start: the timer first, the tree on the first tick.
    pub fn start_lazy(&self) {
        Arc::clone(&self.supervisor).start_lazy();
    }

    /// Shuts the whole tree down, bounded by the configured grace period,
    /// then drains the subscriber workers.
    pub async fn shutdown(self) -> Result<(), CompError> {
        let res = with_deadline(self.cfg.grace, self.supervisor.shutdown()).await;
        self.listener.abort();
        let _ = self.listener.await;
        if let Some(set) = Arc::into_inner(self.subs) {
            set.shutdown().await;
        }
        res
    }
}
