//! Six leaves that die at random under a one-for-all supervisor: watch the
//! cascade restarts go by, then observe a healthy tree.
//!
//! Run with: `cargo run --example flaky_leaves`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use compvisor::{
    CompError, Component, ComponentRef, ComponentSpec, Config, ContextRef, Factory, Kernel,
    LogWriter, Module, Probe, TableResolver, TreeBuilder,
};
use serde_json::json;

/// A leaf whose health check fails with the probability in `env.mtbf_p`.
struct FlakyLeaf {
    kernel: Kernel,
    fail_p: f64,
}

#[async_trait]
impl Component for FlakyLeaf {
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
        self.kernel.checkup()?;
        if rand::random::<f64>() < self.fail_p {
            return Err(CompError::app("simulated crash"));
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), CompError> {
        self.kernel.shutdown()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }
}

struct FlakyFactory;

#[async_trait]
impl Factory for FlakyFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        let fail_p = spec
            .env_value("mtbf_p")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.1);
        Ok(Arc::new(FlakyLeaf {
            kernel: Kernel::new(ctx, spec)?,
            fail_p,
        }))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compvisor=debug".into()),
        )
        .init();

    let leaves: Vec<serde_json::Value> = (1..=6)
        .map(|i| {
            json!({
                "name": format!("leaf{i}"),
                "module": "demo#flaky",
                "env": {"msg": format!("leaf number {i}"), "mtbf_p": 0.15}
            })
        })
        .collect();

    let resolver = TableResolver::new("demo")
        .with_module(
            "demo",
            Module::new()
                .with_factory("flaky", Arc::new(FlakyFactory))
                .into_ref(),
        )
        .with_description(
            "faulty.json",
            json!({
                "name": "top",
                "module": "supervisor",
                "env": {
                    "interval": 500, "die_delay": -1, "max_hang_retries": 3,
                    "max_retries": 3, "retry_delay": 100
                },
                "components": leaves
            }),
        )
        .into_arc();

    let tree = TreeBuilder::new(Config::default())
        .with_resolvers(vec![resolver])
        .with_subscribers(vec![Arc::new(LogWriter)])
        .launch("faulty.json")
        .await?;

    tree.start().await?;
    println!("tree is up; letting leaves crash for 10s...");
    tokio::time::sleep(Duration::from_secs(10)).await;

    for i in 1..=6 {
        let name = format!("leaf{i}");
        let alive = tree
            .children()
            .lookup(&name)
            .map(|c| !c.is_shutdown())
            .unwrap_or(false);
        println!("{name}: alive={alive}");
    }

    tree.shutdown().await?;
    Ok(())
}
