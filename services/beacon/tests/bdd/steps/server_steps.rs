//! BDD step definitions for HTTP endpoint feature

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use chrono::Utc;
use cucumber::{given, then, when};
use tower::ServiceExt;

use beacon::dispatcher::Dispatcher;
use beacon::server::{build_router, AppState};
use beacon::status::new_status_store;
use beacon::NotificationService;

use crate::steps::channel_steps::parse_health;
use crate::world::BeaconWorld;

fn app_state(world: &mut BeaconWorld) -> AppState {
    let status = world
        .status
        .get_or_insert_with(|| new_status_store().0)
        .clone();
    let notifications = world
        .notifications
        .get_or_insert_with(|| {
            NotificationService::new(Duration::from_secs(300), Arc::new(Dispatcher::default()))
        })
        .clone();
    AppState {
        status,
        notifications,
        check_interval_seconds: 300,
    }
}

async fn send(world: &mut BeaconWorld, request: Request<Body>) {
    let state = app_state(world);
    let response = build_router(state).oneshot(request).await.unwrap();
    world.response_status = Some(response.status().as_u16());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    world.response_body = serde_json::from_slice(&bytes).ok();
}

fn body(world: &BeaconWorld) -> &serde_json::Value {
    world.response_body.as_ref().expect("no JSON response body")
}

#[given(expr = "the last poll found the API {string}")]
async fn last_poll_found(world: &mut BeaconWorld, state: String) {
    let (store, writer) = new_status_store();
    writer.set_running(true).await;
    writer.set(parse_health(&state), Utc::now()).await;
    world.status = Some(store);
}

#[when(expr = "a client requests {string}")]
async fn client_requests(world: &mut BeaconWorld, path: String) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    send(world, request).await;
}

#[when(expr = "a client posts the event {string} via {string}")]
async fn client_posts_event(world: &mut BeaconWorld, body: String, forwarded_for: String) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/events")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(body))
        .unwrap();
    send(world, request).await;
}

#[then(expr = "the response status should be {int}")]
fn response_status(world: &mut BeaconWorld, status: u16) {
    assert_eq!(world.response_status, Some(status));
}

#[then(expr = "the response field {string} should be {string}")]
fn response_field(world: &mut BeaconWorld, field: String, value: String) {
    assert_eq!(body(world)[field.as_str()], value.as_str());
}

#[then(expr = "the response field {string} should equal {word}")]
fn response_literal(world: &mut BeaconWorld, field: String, literal: String) {
    let expected: serde_json::Value = serde_json::from_str(&literal).expect("not a JSON literal");
    assert_eq!(body(world)[field.as_str()], expected);
}

#[then(expr = "the response should report monitoring as {word}")]
fn monitoring_flag(world: &mut BeaconWorld, running: String) {
    assert_eq!(body(world)["uptime"]["is_monitoring"], running == "active");
}

#[then(expr = "{int} event(s) should be buffered")]
fn events_buffered(world: &mut BeaconWorld, count: usize) {
    let notifications = world.notifications.as_ref().expect("no notification service");
    assert_eq!(notifications.pending(), count);
}
