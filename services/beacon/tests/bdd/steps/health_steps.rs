//! BDD step definitions for health monitoring feature

use std::sync::{Arc, Mutex};

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use beacon::channel::{AlertKind, Channel};
use beacon::config::MonitorConfig;
use beacon::dispatcher::Dispatcher;
use beacon::monitor::HealthMonitor;
use beacon::status::new_status_store;

use crate::steps::channel_steps::parse_health;
use crate::world::{BeaconWorld, ScriptedProbe};

fn monitor(world: &BeaconWorld) -> &HealthMonitor {
    world.monitor.as_ref().expect("health monitor not created")
}

async fn alert_kinds(world: &BeaconWorld) -> Vec<AlertKind> {
    world
        .recorder
        .messages
        .read()
        .await
        .iter()
        .filter_map(|m| m.alert.as_ref().map(|a| a.kind))
        .collect()
}

#[given(expr = "a health monitor whose probe reports {string}")]
fn health_monitor(world: &mut BeaconWorld, script: String) {
    let states = script
        .split(',')
        .map(|s| parse_health(s.trim()))
        .collect();
    let probe = ScriptedProbe {
        states: Mutex::new(states),
    };
    let dispatcher = Dispatcher::new(vec![world.recorder.clone() as Arc<dyn Channel>]);
    let (store, writer) = new_status_store();

    world.monitor = Some(HealthMonitor::new(
        Arc::new(probe),
        Arc::new(dispatcher),
        writer,
        &MonitorConfig::default(),
        CancellationToken::new(),
    ));
    world.status = Some(store);
}

#[when(expr = "the monitor polls {int} time(s)")]
async fn monitor_polls(world: &mut BeaconWorld, count: usize) {
    let monitor = monitor(world);
    for _ in 0..count {
        monitor.poll_once().await;
    }
}

#[when("the all-clear heartbeat fires")]
async fn heartbeat_fires(world: &mut BeaconWorld) {
    let report = monitor(world).send_heartbeat().await;
    world.heartbeat_report = report;
}

#[then(expr = "{int} status change alert(s) should have been sent")]
async fn status_alerts_sent(world: &mut BeaconWorld, count: usize) {
    let changes = alert_kinds(world)
        .await
        .into_iter()
        .filter(|k| matches!(k, AlertKind::StatusChanged { .. }))
        .count();
    assert_eq!(changes, count);
}

#[then(expr = "the alert number {int} should announce {string} after {string}")]
async fn alert_announces(world: &mut BeaconWorld, index: usize, current: String, previous: String) {
    let kinds = alert_kinds(world).await;
    let kind = kinds.get(index - 1).expect("no such alert");
    assert_eq!(
        *kind,
        AlertKind::StatusChanged {
            previous: parse_health(&previous),
            current: parse_health(&current),
        }
    );
}

#[then("an all-clear report should have been sent")]
async fn all_clear_sent(world: &mut BeaconWorld) {
    assert!(world.heartbeat_report.is_some());
    assert_eq!(alert_kinds(world).await.last(), Some(&AlertKind::AllClear));
}

#[then("no all-clear report should have been sent")]
async fn no_all_clear_sent(world: &mut BeaconWorld) {
    assert!(world.heartbeat_report.is_none());
    assert!(!alert_kinds(world).await.contains(&AlertKind::AllClear));
}

#[then(expr = "the stored status should be {string}")]
async fn stored_status(world: &mut BeaconWorld, expected: String) {
    let status = world.status.as_ref().expect("no status store").get().await;
    assert_eq!(status.value, parse_health(&expected));
}

#[then(expr = "the stored status should show {int} consecutive failure(s)")]
async fn stored_failures(world: &mut BeaconWorld, count: u32) {
    let status = world.status.as_ref().expect("no status store").get().await;
    assert_eq!(status.consecutive_failures, count);
}
