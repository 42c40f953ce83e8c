//! Slack incoming-webhook channel

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::channel::{Channel, ChannelKind, Message};
use crate::event::fit_to_limit;
use crate::io::HttpClient;

const MAX_TEXT_CHARS: usize = 40_000;

/// Sends messages to a Slack incoming webhook
pub struct SlackChannel {
    webhook_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for SlackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackChannel").finish_non_exhaustive()
    }
}

impl SlackChannel {
    pub fn new(webhook_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            http,
        }
    }

    /// Build the webhook body: mrkdwn text, plus an attachment for status alerts
    pub fn payload(message: &Message) -> Value {
        // Slack mrkdwn marks bold with single asterisks
        let text = message.text.replace("**", "*");
        let mut body = json!({ "text": fit_to_limit(&text, MAX_TEXT_CHARS) });

        if let Some(alert) = &message.alert {
            let fields: Vec<Value> = alert
                .fields
                .iter()
                .map(|f| json!({ "title": f.name, "value": f.value, "short": f.inline }))
                .collect();
            body["attachments"] = json!([{
                "color": format!("#{:06x}", alert.color()),
                "title": alert.title,
                "fields": fields,
                "ts": alert.timestamp.timestamp(),
            }]);
        }
        body
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    async fn send(&self, message: &Message) -> crate::Result<()> {
        let response = self
            .http
            .post_json(&self.webhook_url, &Self::payload(message))
            .await?;

        if response.status != 200 {
            return Err(crate::BeaconError::Channel(format!(
                "Slack webhook returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Slack notification sent");
        Ok(())
    }
}
