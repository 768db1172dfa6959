//! Minimal walkthrough: a JSON description plus a sibling delta become a
//! live, supervised component.
//!
//! Run with: `cargo run --example hello_tree`

use std::sync::Arc;

use async_trait::async_trait;
use compvisor::{
    CompError, Component, ComponentRef, ComponentSpec, Config, ContextRef, Factory, Kernel,
    LogWriter, Module, Probe, TableResolver, TreeBuilder,
};
use serde_json::json;

struct Hello {
    kernel: Kernel,
}

impl Hello {
    fn message(&self) -> String {
        self.kernel
            .spec()
            .env_str("msg")
            .unwrap_or("<no message>")
            .to_string()
    }
}

#[async_trait]
impl Component for Hello {
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

struct HelloFactory;

#[async_trait]
impl Factory for HelloFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        Ok(Arc::new(Hello {
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
                .with_factory("hello", Arc::new(HelloFactory))
                .into_ref(),
        )
        .with_description(
            "hello.json",
            json!({
                "name": "top",
                "module": "supervisor",
                "env": {
                    "interval": 1000, "die_delay": -1, "max_hang_retries": 3,
                    "max_retries": 2, "retry_delay": 100
                },
                "components": [
                    {"name": "hello", "module": "demo#hello", "env": {"msg": "hola mundo"}}
                ]
            }),
        )
        // The sibling delta overrides the message without touching the base.
        .with_description(
            "hello++.json",
            json!({
                "name": "top",
                "components": [
                    {"name": "hello", "env": {"msg": "adios mundo"}}
                ]
            }),
        )
        .into_arc();

    let tree = TreeBuilder::new(Config::default())
        .with_resolvers(vec![resolver])
        .with_subscribers(vec![Arc::new(LogWriter)])
        .launch("hello.json")
        .await?;

    tree.start().await?;

    let hello = tree
        .children()
        .lookup("hello")
        .expect("hello is alive")
        .as_any()
        .downcast::<Hello>()
        .ok()
        .expect("hello is a Hello");
    println!("hello says: {}", hello.message());

    tree.shutdown().await?;
    Ok(())
}
