//! Fan-out of one message to every configured channel

use std::sync::Arc;

use crate::channel::{Channel, ChannelKind, Message};
use crate::config::ChannelConfig;
use crate::discord::DiscordChannel;
use crate::io::HttpClient;
use crate::slack::SlackChannel;
use crate::telegram::TelegramChannel;

/// Outcome of one dispatch across all channels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: Vec<ChannelKind>,
    pub failed: Vec<ChannelKind>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Delivers messages to a fixed set of channels
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    channels: Vec<Arc<dyn Channel>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn Channel>>) -> Self {
        Self { channels }
    }

    /// Build channels for every enabled config entry; the rest are skipped silently
    pub fn from_config<'a>(
        configs: impl IntoIterator<Item = &'a ChannelConfig>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let mut channels: Vec<Arc<dyn Channel>> = Vec::new();
        for config in configs {
            if !config.is_enabled() {
                tracing::debug!("Channel '{}' is not configured, skipping", config.kind());
                continue;
            }
            let channel: Arc<dyn Channel> = match config {
                ChannelConfig::Discord { webhook_url } => {
                    Arc::new(DiscordChannel::new(webhook_url, Arc::clone(&http)))
                }
                ChannelConfig::Slack { webhook_url } => {
                    Arc::new(SlackChannel::new(webhook_url, Arc::clone(&http)))
                }
                ChannelConfig::Telegram { bot_token, chat_id } => Arc::new(TelegramChannel::new(
                    bot_token,
                    chat_id,
                    Arc::clone(&http),
                )),
            };
            channels.push(channel);
        }
        Self { channels }
    }

    pub fn channel_kinds(&self) -> Vec<ChannelKind> {
        self.channels.iter().map(|c| c.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send to every channel in turn. A failing channel never stops the others
    /// and failures are never returned to the caller.
    pub async fn dispatch(&self, message: &Message) -> DispatchReport {
        let mut report = DispatchReport::default();

        for channel in &self.channels {
            let kind = channel.kind();
            tracing::debug!("Dispatching to '{}'", kind);

            match channel.send(message).await {
                Ok(()) => report.succeeded.push(kind),
                Err(e) => {
                    tracing::warn!("Notification via '{}' failed: {}", kind, e);
                    report.failed.push(kind);
                }
            }
        }

        if !report.failed.is_empty() {
            tracing::debug!(
                "Dispatch finished: {} succeeded, {} failed",
                report.succeeded.len(),
                report.failed.len()
            );
        }
        report
    }
}
