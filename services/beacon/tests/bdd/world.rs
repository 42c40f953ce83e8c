//! BDD test world for beacon service

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cucumber::World;
use tokio::sync::RwLock;

use beacon::channel::{Channel, ChannelKind, Message};
use beacon::config::ChannelConfig;
use beacon::dispatcher::DispatchReport;
use beacon::io::{HttpClient, HttpResponse};
use beacon::monitor::HealthMonitor;
use beacon::status::{HealthState, StatusStore};
use beacon::NotificationService;

/// A request captured by [`RecordingHttpClient`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub body: serde_json::Value,
}

/// HTTP client that records every POST and answers with a per-URL status
#[derive(Debug, Default)]
pub struct RecordingHttpClient {
    pub requests: Mutex<Vec<RecordedRequest>>,
    pub statuses: Mutex<HashMap<String, u16>>,
}

impl RecordingHttpClient {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_to(&self, prefix: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .find(|r| r.url.starts_with(prefix))
    }
}

#[async_trait::async_trait]
impl HttpClient for RecordingHttpClient {
    async fn get(&self, _url: &str) -> beacon::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: "{}".to_string(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> beacon::Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            body: body.clone(),
        });
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(200);
        Ok(HttpResponse {
            status,
            body: "ok".to_string(),
        })
    }
}

/// A channel that keeps every message it is given
#[derive(Debug, Default)]
pub struct RecordingChannel {
    pub messages: RwLock<Vec<Message>>,
}

#[async_trait::async_trait]
impl Channel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    async fn send(&self, message: &Message) -> beacon::Result<()> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }
}

/// A probe that replays scripted verdicts, then reports up
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    pub states: Mutex<Vec<HealthState>>,
}

#[async_trait::async_trait]
impl beacon::probe::Probe for ScriptedProbe {
    async fn poll(&self) -> beacon::Result<HealthState> {
        let mut states = self.states.lock().unwrap();
        if states.is_empty() {
            Ok(HealthState::Up)
        } else {
            Ok(states.remove(0))
        }
    }
}

#[derive(Default, World)]
pub struct BeaconWorld {
    // Channel testing
    pub http: Arc<RecordingHttpClient>,
    pub channel_configs: Vec<ChannelConfig>,
    pub dispatch_report: Option<DispatchReport>,

    // Buffer testing
    pub recorder: Arc<RecordingChannel>,
    pub notifications: Option<NotificationService>,

    // Monitor testing
    pub monitor: Option<HealthMonitor>,
    pub status: Option<StatusStore>,
    pub heartbeat_report: Option<DispatchReport>,

    // Server testing
    pub response_status: Option<u16>,
    pub response_body: Option<serde_json::Value>,
}

impl std::fmt::Debug for BeaconWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeaconWorld")
            .field("channel_configs", &self.channel_configs.len())
            .field("dispatch_report", &self.dispatch_report)
            .field("notifications", &self.notifications)
            .field("response_status", &self.response_status)
            .finish()
    }
}
