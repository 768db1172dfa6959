//! Static container semantics: ordering, unknown sweep, restart hints.

mod common;

use std::sync::Arc;

use compvisor::{
    Bus, CompError, Component, ComponentSpec, Container, Context, ContextRef, Loader, Probe,
};
use serde_json::json;

fn setup_ctx() -> ContextRef {
    let ctx = Context::new_root(Bus::new(64));
    let loader = Arc::new(Loader::new());
    loader.set_resolvers(vec![common::app_resolver(vec![])]);
    ctx.set_loader(loader);
    ctx
}

fn container_spec(children: serde_json::Value) -> ComponentSpec {
    ComponentSpec::from_value(json!({
        "name": "grp",
        "module": "std#container",
        "env": {"max_retries": 2, "retry_delay": 10},
        "components": children
    }))
    .unwrap()
}

#[tokio::test]
async fn children_start_in_order_and_stop_in_reverse() {
    common::clear_order_events();
    let ctx = setup_ctx();
    let spec = container_spec(json!([
        {"name": "o1", "module": "app#order", "env": {}},
        {"name": "o2", "module": "app#order", "env": {}},
        {"name": "o3", "module": "app#order", "env": {}}
    ]));
    let grp = Container::new(&ctx, spec).unwrap();

    let mut probe = Probe::default();
    grp.checkup(&mut probe).await.unwrap();
    assert!(probe.restart_all, "first checkup builds the tree");

    grp.shutdown().await.unwrap();

    let events = common::order_events();
    let expected = [
        ("create", "o1"),
        ("create", "o2"),
        ("create", "o3"),
        ("shutdown", "o3"),
        ("shutdown", "o2"),
        ("shutdown", "o1"),
    ];
    let got: Vec<(&str, &str)> = events
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn unknown_children_are_swept_unless_adopted() {
    let ctx = setup_ctx();
    let spec = container_spec(json!([
        {"name": "known", "module": "app#hello", "env": {"msg": "k"}}
    ]));
    let grp = Container::new(&ctx, spec).unwrap();
    grp.checkup(&mut Probe::default()).await.unwrap();

    // Register a stray and an adopted component behind the container's back.
    let loader = ctx.loader().unwrap();
    let stray = ComponentSpec::from_value(json!({
        "name": "stray", "module": "app#hello", "env": {}
    }))
    .unwrap();
    let adopted = ComponentSpec::from_value(json!({
        "name": "adopted", "module": "app#hello", "env": {"__adopted__": true}
    }))
    .unwrap();
    loader
        .load_component(grp.children_ctx(), &stray)
        .await
        .unwrap();
    loader
        .load_component(grp.children_ctx(), &adopted)
        .await
        .unwrap();

    grp.checkup(&mut Probe::default()).await.unwrap();

    assert!(grp.children_ctx().lookup("known").is_some());
    assert!(grp.children_ctx().lookup("stray").is_none());
    assert!(grp.children_ctx().lookup("adopted").is_some());

    grp.shutdown().await.unwrap();
}

#[tokio::test]
async fn do_not_restart_turns_failures_into_errors() {
    let ctx = setup_ctx();
    let spec = container_spec(json!([
        {"name": "dnr_leaf", "module": "app#flaky", "env": {"fail_after": 2}}
    ]));
    let grp = Container::new(&ctx, spec).unwrap();
    grp.checkup(&mut Probe::default()).await.unwrap();

    // The leaf's next health check fails; the hint forbids the cascade.
    let mut probe = Probe {
        do_not_restart: true,
        ..Probe::default()
    };
    let err = grp.checkup(&mut probe).await.expect_err("must propagate");
    assert!(matches!(err, CompError::App { .. }));
    assert!(!probe.restart_all);

    // The incumbent was left alone.
    let leaf = grp
        .children_ctx()
        .lookup("dnr_leaf")
        .unwrap()
        .as_any()
        .downcast::<common::FlakyLeaf>()
        .ok()
        .unwrap();
    assert_eq!(leaf.generation(), 1);

    // Without the hint the cascade replaces it.
    let mut probe = Probe::default();
    grp.checkup(&mut probe).await.unwrap();
    assert!(probe.restart_all);
    let leaf = grp
        .children_ctx()
        .lookup("dnr_leaf")
        .unwrap()
        .as_any()
        .downcast::<common::FlakyLeaf>()
        .ok()
        .unwrap();
    assert!(leaf.generation() >= 2);

    grp.shutdown().await.unwrap();
}

#[tokio::test]
async fn duplicate_child_names_fail_construction() {
    let ctx = setup_ctx();
    let spec = container_spec(json!([
        {"name": "twin", "module": "app#hello", "env": {}},
        {"name": "twin", "module": "app#hello", "env": {}}
    ]));
    assert!(Container::new(&ctx, spec).is_err());
}

#[tokio::test]
async fn shutdown_is_idempotent_and_monotonic() {
    let ctx = setup_ctx();
    let spec = container_spec(json!([
        {"name": "once", "module": "app#hello", "env": {}}
    ]));
    let grp = Container::new(&ctx, spec).unwrap();
    grp.checkup(&mut Probe::default()).await.unwrap();

    grp.shutdown().await.unwrap();
    assert!(grp.is_shutdown());
    grp.shutdown().await.unwrap();
    assert!(grp.is_shutdown());

    // A shut-down container refuses further checkups.
    let err = grp.checkup(&mut Probe::default()).await.expect_err("down");
    assert!(matches!(err, CompError::Shutdown { .. }));
}
