//! Discord webhook channel

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::channel::{Channel, ChannelKind, Message};
use crate::event::fit_to_limit;
use crate::io::HttpClient;

/// Discord rejects message content longer than this
const MAX_CONTENT_CHARS: usize = 2000;

/// Sends messages to a Discord channel webhook
pub struct DiscordChannel {
    webhook_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for DiscordChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordChannel").finish_non_exhaustive()
    }
}

impl DiscordChannel {
    pub fn new(webhook_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            http,
        }
    }

    /// Build the webhook body: plain content, plus an embed for status alerts
    pub fn payload(message: &Message) -> Value {
        let mut body = json!({ "content": fit_to_limit(&message.text, MAX_CONTENT_CHARS) });

        if let Some(alert) = &message.alert {
            let fields: Vec<Value> = alert
                .fields
                .iter()
                .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
                .collect();
            body["embeds"] = json!([{
                "title": alert.title,
                "color": alert.color(),
                "fields": fields,
                "timestamp": alert.timestamp.to_rfc3339(),
            }]);
        }
        body
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    async fn send(&self, message: &Message) -> crate::Result<()> {
        let response = self
            .http
            .post_json(&self.webhook_url, &Self::payload(message))
            .await?;

        // Discord answers 204 No Content on success
        if !response.is_success() {
            return Err(crate::BeaconError::Channel(format!(
                "Discord webhook returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Discord notification sent");
        Ok(())
    }
}
