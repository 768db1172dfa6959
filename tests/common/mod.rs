//! Shared fixtures: leaf components, factories, and an event recorder.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};

use compvisor::{
    CompError, Component, ComponentRef, ComponentSpec, ContextRef, Event, EventKind, Factory,
    Kernel, Module, ModuleRef, Probe, Resolver, Subscribe, TableResolver,
};

// ---------------------------------------------------------------------------
// Incarnation registry: counts how many times a name has been instantiated.
// ---------------------------------------------------------------------------

static INCARNATIONS: OnceLock<Mutex<HashMap<String, u32>>> = OnceLock::new();

fn next_incarnation(name: &str) -> u32 {
    let mut map = INCARNATIONS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap();
    let n = map.entry(name.to_string()).or_insert(0);
    *n += 1;
    *n
}

pub fn incarnations(name: &str) -> u32 {
    INCARNATIONS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap()
        .get(name)
        .copied()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Hello: a leaf exposing its env fields.
// ---------------------------------------------------------------------------

pub struct Hello {
    kernel: Kernel,
}

impl Hello {
    pub fn message(&self) -> Option<String> {
        self.kernel.spec().env_str("msg").map(str::to_string)
    }

    pub fn number(&self) -> Option<i64> {
        self.kernel.spec().env_i64("number")
    }

    pub fn other_message(&self) -> Option<String> {
        self.kernel.spec().env_str("other_message").map(str::to_string)
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

// ---------------------------------------------------------------------------
// FlakyLeaf: its first incarnation fails its `fail_after`-th health check.
// Replacement incarnations are healthy, so each name triggers exactly one
// fault-induced restart.
// ---------------------------------------------------------------------------

pub struct FlakyLeaf {
    kernel: Kernel,
    generation: u32,
    checks: AtomicU32,
    fail_after: u32,
}

impl FlakyLeaf {
    pub fn generation(&self) -> u32 {
        self.generation
    }
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
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        if self.generation == 1 && n >= self.fail_after {
            return Err(CompError::app("injected fault"));
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
        let fail_after = spec.env_u64("fail_after").unwrap_or(2) as u32;
        let generation = next_incarnation(&spec.name);
        Ok(Arc::new(FlakyLeaf {
            kernel: Kernel::new(ctx, spec)?,
            generation,
            checks: AtomicU32::new(0),
            fail_after,
        }))
    }
}

// ---------------------------------------------------------------------------
// TempLeaf: shuts itself down once `life_ms` has elapsed.
// ---------------------------------------------------------------------------

pub struct TempLeaf {
    kernel: Kernel,
    deadline: Instant,
}

#[async_trait]
impl Component for TempLeaf {
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
        if Instant::now() >= self.deadline {
            self.kernel.shutdown()?;
            return Err(CompError::app("lifetime expired"));
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

struct TempFactory;

#[async_trait]
impl Factory for TempFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        let life = Duration::from_millis(spec.env_u64("life_ms").unwrap_or(200));
        Ok(Arc::new(TempLeaf {
            kernel: Kernel::new(ctx, spec)?,
            deadline: Instant::now() + life,
        }))
    }
}

// ---------------------------------------------------------------------------
// HangLeaf: every health check after the first never completes.
// ---------------------------------------------------------------------------

pub struct HangLeaf {
    kernel: Kernel,
    checks: AtomicU32,
}

#[async_trait]
impl Component for HangLeaf {
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
        if self.checks.fetch_add(1, Ordering::SeqCst) >= 1 {
            return std::future::pending().await;
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

struct HangFactory;

#[async_trait]
impl Factory for HangFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        Ok(Arc::new(HangLeaf {
            kernel: Kernel::new(ctx, spec)?,
            checks: AtomicU32::new(0),
        }))
    }
}

// ---------------------------------------------------------------------------
// OrderLeaf: records creations and shutdowns into a global log.
// ---------------------------------------------------------------------------

static ORDER: OnceLock<Mutex<Vec<(String, String)>>> = OnceLock::new();

fn order_log() -> &'static Mutex<Vec<(String, String)>> {
    ORDER.get_or_init(|| Mutex::new(Vec::new()))
}

pub fn order_events() -> Vec<(String, String)> {
    order_log().lock().unwrap().clone()
}

pub fn clear_order_events() {
    order_log().lock().unwrap().clear();
}

pub struct OrderLeaf {
    kernel: Kernel,
}

#[async_trait]
impl Component for OrderLeaf {
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
        if !self.kernel.is_shutdown() {
            order_log()
                .lock()
                .unwrap()
                .push(("shutdown".to_string(), self.kernel.name().to_string()));
        }
        self.kernel.shutdown()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }
}

struct OrderFactory;

#[async_trait]
impl Factory for OrderFactory {
    async fn new_instance(
        &self,
        ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        order_log()
            .lock()
            .unwrap()
            .push(("create".to_string(), spec.name.clone()));
        Ok(Arc::new(OrderLeaf {
            kernel: Kernel::new(ctx, spec)?,
        }))
    }
}

// ---------------------------------------------------------------------------
// BrokenFactory: always fails.
// ---------------------------------------------------------------------------

struct BrokenFactory;

#[async_trait]
impl Factory for BrokenFactory {
    async fn new_instance(
        &self,
        _ctx: &ContextRef,
        spec: ComponentSpec,
    ) -> Result<ComponentRef, CompError> {
        Err(CompError::FactoryFailed {
            name: spec.name,
            reason: "configured to fail".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Module table + resolver wiring.
// ---------------------------------------------------------------------------

pub fn app_module() -> ModuleRef {
    Module::new()
        .with_factory("hello", Arc::new(HelloFactory))
        .with_factory("flaky", Arc::new(FlakyFactory))
        .with_factory("temp", Arc::new(TempFactory))
        .with_factory("hang", Arc::new(HangFactory))
        .with_factory("order", Arc::new(OrderFactory))
        .with_factory("broken", Arc::new(BrokenFactory))
        .into_ref()
}

/// Resolver exposing the `app` module plus the given descriptions.
pub fn app_resolver(descs: Vec<(&str, Value)>) -> Arc<dyn Resolver> {
    let mut r = TableResolver::new("app").with_module("app", app_module());
    for (name, doc) in descs {
        r = r.with_description(name, doc);
    }
    r.into_arc()
}

/// Root supervisor env with test-friendly timings.
pub fn sup_env(interval_ms: u64) -> Value {
    json!({
        "interval": interval_ms,
        "die_delay": -1,
        "max_hang_retries": 2,
        "max_retries": 2,
        "retry_delay": 20
    })
}

// ---------------------------------------------------------------------------
// Recorder subscriber.
// ---------------------------------------------------------------------------

pub struct Recorder {
    log: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> (Arc<Self>, Arc<Mutex<Vec<Event>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                log: Arc::clone(&log),
            }),
            log,
        )
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.log.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

pub fn count_kind(log: &Mutex<Vec<Event>>, kind: EventKind) -> usize {
    log.lock().unwrap().iter().filter(|e| e.kind == kind).count()
}
