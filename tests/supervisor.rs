//! Supervisor scenarios: fault-induced cascades, hang escalation, start modes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use compvisor::{CompError, Component, Config, EventKind, Subscribe, TreeBuilder};
use serde_json::json;

#[tokio::test]
async fn faulty_leaves_trigger_a_one_for_all_cascade() {
    let leaves: Vec<serde_json::Value> = (1..=6)
        .map(|i| {
            json!({
                "name": format!("ofa_leaf{i}"),
                "module": "app#flaky",
                "env": {"msg": format!("m{i}"), "fail_after": 2}
            })
        })
        .collect();
    let desc = json!({
        "name": "top",
        "module": "supervisor",
        "env": common::sup_env(50),
        "components": leaves
    });

    let (recorder, log) = common::Recorder::new();
    let tree = TreeBuilder::new(Config::default())
        .with_resolvers(vec![common::app_resolver(vec![("faulty.json", desc)])])
        .with_subscribers(vec![recorder as Arc<dyn Subscribe>])
        .launch("faulty.json")
        .await
        .unwrap();
    tree.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    // Every leaf is present, alive, and reporting its message.
    for i in 1..=6 {
        let name = format!("ofa_leaf{i}");
        let leaf = tree
            .children()
            .lookup(&name)
            .unwrap()
            .as_any()
            .downcast::<common::FlakyLeaf>()
            .ok()
            .unwrap();
        assert!(!leaf.is_shutdown(), "{name} should be alive");
        assert_eq!(
            leaf.spec().env_str("msg"),
            Some(format!("m{i}")).as_deref()
        );
        // The fault-induced cascade replaced the first incarnation.
        assert!(leaf.generation() >= 2, "{name} was never restarted");
    }

    // One cascade built the tree at start; at least one more was triggered
    // by the injected faults.
    assert!(common::count_kind(&log, EventKind::AllRestarted) >= 2);
    assert!(common::count_kind(&log, EventKind::CheckupPassed) >= 1);

    tree.shutdown().await.unwrap();
}

#[tokio::test]
async fn hanging_checkups_escalate_to_die() {
    let desc = json!({
        "name": "top",
        "module": "supervisor",
        // die_delay = -1 keeps the process alive for the assertions.
        "env": common::sup_env(50),
        "components": [
            {"name": "stuck", "module": "app#hang", "env": {}}
        ]
    });

    let (recorder, log) = common::Recorder::new();
    let tree = TreeBuilder::new(Config::default())
        .with_resolvers(vec![common::app_resolver(vec![("hang.json", desc)])])
        .with_subscribers(vec![recorder as Arc<dyn Subscribe>])
        .launch("hang.json")
        .await
        .unwrap();
    tree.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(tree.supervisor().is_shutdown());
    assert!(!tree.supervisor().is_running());
    assert!(common::count_kind(&log, EventKind::HangRetrying) >= 1);
    assert_eq!(common::count_kind(&log, EventKind::Dying), 1);

    tree.shutdown().await.unwrap();
}

#[tokio::test]
async fn failing_sync_start_leaves_the_timer_unarmed() {
    let desc = json!({
        "name": "top",
        "module": "supervisor",
        "env": common::sup_env(50),
        "components": [
            {"name": "nope", "module": "app#broken", "env": {}}
        ]
    });

    let tree = TreeBuilder::new(Config::default())
        .with_resolvers(vec![common::app_resolver(vec![("broken.json", desc)])])
        .launch("broken.json")
        .await
        .unwrap();

    let err = tree.start().await.expect_err("start must fail");
    assert!(matches!(err, CompError::MissingChild { .. }));
    assert!(!tree.supervisor().is_running());

    tree.shutdown().await.unwrap();
}

#[tokio::test]
async fn lazy_start_builds_the_tree_on_the_first_tick() {
    let desc = json!({
        "name": "top",
        "module": "supervisor",
        "env": common::sup_env(50),
        "components": [
            {"name": "lazy_hello", "module": "app#hello", "env": {"msg": "late"}}
        ]
    });

    let tree = TreeBuilder::new(Config::default())
        .with_resolvers(vec![common::app_resolver(vec![("lazy.json", desc)])])
        .launch("lazy.json")
        .await
        .unwrap();

    assert!(tree.children().lookup("lazy_hello").is_none());
    tree.start_lazy();

    tokio::time::sleep(Duration::from_millis(300)).await;
    let hello = tree
        .children()
        .lookup("lazy_hello")
        .unwrap()
        .as_any()
        .downcast::<common::Hello>()
        .ok()
        .unwrap();
    assert_eq!(hello.message().as_deref(), Some("late"));

    tree.shutdown().await.unwrap();
}
