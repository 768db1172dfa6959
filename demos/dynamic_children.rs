//! Runtime membership: add children to a dynamic container, delete a few,
//! and watch one-for-one supervision keep the rest alive.
//!
//! Run with: `cargo run --example dynamic_children`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use compvisor::{
    CompError, Component, ComponentRef, ComponentSpec, Config, ContextRef, DynamicContainer,
    Factory, Kernel, LogWriter, Module, Probe, TableResolver, TreeBuilder,
};
use serde_json::json;

struct Worker {
    kernel: Kernel,
}

#[async_trait]
impl Component for Worker {
    fn spec(&self) -> &ComponentSpec {
        self.kernel.spec()
    }

    fn instance_id(&self) -> u64 {
        self.kernel.id()
    }

    fn is_shutdown(&self) -> bool {
        self.kernel.is_shutdown()
    }

    async fn checkup(&self, _probe: &mut Probe) -> Result<(), CompError> {
        self.kernel.checkup()
    }

    async fn shutdown(&self) -> Result<(), CompError> {
        self.kernel.shutdown()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }
}

struct WorkerFactory;

#[async_trait]
impl Factory for WorkerFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        Ok(Arc::new(Worker {
            kernel: Kernel::new(ctx, spec)?,
        }))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let resolver = TableResolver::new("demo")
        .with_module(
            "demo",
            Module::new()
                .with_factory("worker", Arc::new(WorkerFactory))
                .into_ref(),
        )
        .with_description(
            "pool.json",
            json!({
                "name": "top",
                "module": "supervisor",
                "env": {
                    "interval": 500, "die_delay": -1, "max_hang_retries": 3,
                    "max_retries": 2, "retry_delay": 100
                },
                "components": [{
                    "name": "pool",
                    "module": "std#dynamic",
                    "env": {"max_retries": 2, "retry_delay": 100}
                }]
            }),
        )
        .into_arc();

    let tree = TreeBuilder::new(Config::default())
        .with_resolvers(vec![resolver])
        .with_subscribers(vec![Arc::new(LogWriter)])
        .launch("pool.json")
        .await?;
    tree.start().await?;

    let pool = tree
        .children()
        .lookup("pool")
        .expect("pool is alive")
        .as_any()
        .downcast::<DynamicContainer>()
        .ok()
        .expect("pool is a dynamic container");

    for i in 1..=5 {
        let spec = ComponentSpec::from_value(json!({
            "name": format!("worker{i}"),
            "module": "demo#worker",
            "env": {}
        }))?;
        pool.instance_child(spec).await?;
        println!("added worker{i}");
    }

    pool.delete_child("worker2").await?;
    pool.delete_child("worker4").await?;
    println!("deleted worker2 and worker4");

    tokio::time::sleep(Duration::from_secs(2)).await;

    let mut names = pool.children_ctx().names();
    names.sort();
    println!("surviving workers: {names:?}");

    tree.shutdown().await?;
    Ok(())
}
