//! BDD step definitions for channel delivery feature

use cucumber::{given, then, when};

use beacon::channel::Message;
use beacon::config::ChannelConfig;
use beacon::dispatcher::Dispatcher;
use beacon::monitor::status_changed_message;
use beacon::status::HealthState;
use chrono::Utc;

use crate::world::BeaconWorld;

pub fn parse_health(s: &str) -> HealthState {
    match s {
        "up" => HealthState::Up,
        "down" => HealthState::Down,
        "unknown" => HealthState::Unknown,
        other => panic!("Unknown health state: {}", other),
    }
}

#[given(expr = "a Discord webhook {string}")]
fn discord_webhook(world: &mut BeaconWorld, url: String) {
    world
        .channel_configs
        .push(ChannelConfig::Discord { webhook_url: url });
}

#[given("an unconfigured Discord webhook")]
fn unconfigured_discord(world: &mut BeaconWorld) {
    world.channel_configs.push(ChannelConfig::Discord {
        webhook_url: String::new(),
    });
}

#[given(expr = "a Slack webhook {string}")]
fn slack_webhook(world: &mut BeaconWorld, url: String) {
    world
        .channel_configs
        .push(ChannelConfig::Slack { webhook_url: url });
}

#[given(expr = "a Telegram bot {string} for chat {string}")]
fn telegram_bot(world: &mut BeaconWorld, bot_token: String, chat_id: String) {
    world
        .channel_configs
        .push(ChannelConfig::Telegram { bot_token, chat_id });
}

#[given(expr = "the endpoint {string} responds with status {int}")]
fn endpoint_responds(world: &mut BeaconWorld, url: String, status: u16) {
    world.http.statuses.lock().unwrap().insert(url, status);
}

#[when(expr = "a status change from {string} to {string} is dispatched")]
async fn status_change_dispatched(world: &mut BeaconWorld, previous: String, current: String) {
    let dispatcher = Dispatcher::from_config(&world.channel_configs, world.http.clone());
    let message = status_changed_message(parse_health(&previous), parse_health(&current), Utc::now());
    world.dispatch_report = Some(dispatcher.dispatch(&message).await);
}

#[when(expr = "the text {string} is dispatched")]
async fn text_dispatched(world: &mut BeaconWorld, text: String) {
    let dispatcher = Dispatcher::from_config(&world.channel_configs, world.http.clone());
    world.dispatch_report = Some(dispatcher.dispatch(&Message::text(text)).await);
}

#[then(expr = "{int} webhook request(s) should have been made")]
fn webhook_request_count(world: &mut BeaconWorld, count: usize) {
    assert_eq!(world.http.requests().len(), count);
}

#[then(expr = "the request to {string} should carry embed color {int}")]
fn embed_color(world: &mut BeaconWorld, url: String, color: u64) {
    let request = world.http.request_to(&url).expect("no request to url");
    assert_eq!(request.body["embeds"][0]["color"], color);
}

#[then(expr = "the request to {string} should have text {string}")]
fn request_text(world: &mut BeaconWorld, url: String, text: String) {
    let request = world.http.request_to(&url).expect("no request to url");
    assert_eq!(request.body["text"], text.as_str());
}

#[then(expr = "the request to {string} should use parse mode {string}")]
fn request_parse_mode(world: &mut BeaconWorld, url: String, parse_mode: String) {
    let request = world.http.request_to(&url).expect("no request to url");
    assert_eq!(request.body["parse_mode"], parse_mode.as_str());
}

#[then(expr = "the dispatch should report {string} as {word}")]
fn dispatch_outcome(world: &mut BeaconWorld, channel: String, outcome: String) {
    let report = world.dispatch_report.as_ref().expect("nothing dispatched");
    let kinds = match outcome.as_str() {
        "succeeded" => &report.succeeded,
        "failed" => &report.failed,
        other => panic!("Unknown outcome: {}", other),
    };
    assert!(
        kinds.iter().any(|k| k.to_string() == channel),
        "{} not {} in {:?}",
        channel,
        outcome,
        report
    );
}
