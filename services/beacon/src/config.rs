//! Configuration types for the beacon service
//!
//! Values come from an optional JSON file, then environment variables, then CLI flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::channel::ChannelKind;

pub const ENV_DISCORD_WEBHOOK: &str = "DISCORD_WEBHOOK";
pub const ENV_SLACK_WEBHOOK: &str = "SLACK_WEBHOOK";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_NOTIF_INTERVAL: &str = "NOTIF_INTERVAL_SECONDS";
pub const ENV_API_CHECK_INTERVAL: &str = "API_CHECK_INTERVAL_SECONDS";
pub const ENV_MONITOR_BASE_URL: &str = "MONITOR_BASE_URL";
pub const ENV_PORT: &str = "PORT";

/// Lower bound for the poll interval and error backoff
const MIN_POLL_SECONDS: u64 = 1;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Webhook channel configuration with tagged enum for extensibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    Discord {
        #[serde(default)]
        webhook_url: String,
    },
    Slack {
        #[serde(default)]
        webhook_url: String,
    },
    Telegram {
        #[serde(default)]
        bot_token: String,
        #[serde(default)]
        chat_id: String,
    },
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelConfig::Discord { .. } => ChannelKind::Discord,
            ChannelConfig::Slack { .. } => ChannelKind::Slack,
            ChannelConfig::Telegram { .. } => ChannelKind::Telegram,
        }
    }

    /// A channel is enabled only when all of its credentials are present.
    pub fn is_enabled(&self) -> bool {
        match self {
            ChannelConfig::Discord { webhook_url } | ChannelConfig::Slack { webhook_url } => {
                !webhook_url.trim().is_empty()
            }
            ChannelConfig::Telegram { bot_token, chat_id } => {
                !bot_token.trim().is_empty() && !chat_id.trim().is_empty()
            }
        }
    }
}

/// Notification buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_notification_interval(),
            webhook_timeout_seconds: default_webhook_timeout(),
        }
    }
}

impl NotificationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_seconds)
    }
}

/// Health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Public base URL of the deployment. The monitor stays off while this is unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_api_path")]
    pub api_path: String,
    #[serde(default = "default_api_payload")]
    pub api_payload: serde_json::Value,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            health_path: default_health_path(),
            api_path: default_api_path(),
            api_payload: default_api_payload(),
            check_interval_seconds: default_check_interval(),
            error_backoff_seconds: default_error_backoff(),
            request_timeout_seconds: default_request_timeout(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
        }
    }
}

impl MonitorConfig {
    /// Time between polls, never shorter than one second
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds.max(MIN_POLL_SECONDS))
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds.max(MIN_POLL_SECONDS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// The deployment base URL to probe, if one is configured
    pub fn target_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
        }
    }
}

fn default_notification_interval() -> u64 {
    300
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_api_path() -> String {
    "/api/ask".to_string()
}

fn default_api_payload() -> serde_json::Value {
    serde_json::json!({ "question": "health check" })
}

fn default_check_interval() -> u64 {
    300
}

fn default_error_backoff() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    15
}

fn default_heartbeat_interval() -> u64 {
    12 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8000
}

impl Config {
    /// Override configuration from the process environment
    pub fn apply_process_env(&mut self) -> crate::Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Override configuration from an environment lookup.
    ///
    /// A channel variable that is present (even empty) replaces that channel's credentials.
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(webhook_url) = lookup(ENV_DISCORD_WEBHOOK) {
            self.upsert_channel(ChannelConfig::Discord { webhook_url });
        }
        if let Some(webhook_url) = lookup(ENV_SLACK_WEBHOOK) {
            self.upsert_channel(ChannelConfig::Slack { webhook_url });
        }

        let token = lookup(ENV_TELEGRAM_BOT_TOKEN);
        let chat = lookup(ENV_TELEGRAM_CHAT_ID);
        if token.is_some() || chat.is_some() {
            let (existing_token, existing_chat) = self
                .channels
                .iter()
                .find_map(|c| match c {
                    ChannelConfig::Telegram { bot_token, chat_id } => {
                        Some((bot_token.clone(), chat_id.clone()))
                    }
                    _ => None,
                })
                .unwrap_or_default();
            self.upsert_channel(ChannelConfig::Telegram {
                bot_token: token.unwrap_or(existing_token),
                chat_id: chat.unwrap_or(existing_chat),
            });
        }

        if let Some(value) = lookup(ENV_NOTIF_INTERVAL) {
            self.notifications.interval_seconds = parse_env(ENV_NOTIF_INTERVAL, &value)?;
        }
        if let Some(value) = lookup(ENV_API_CHECK_INTERVAL) {
            let seconds: u64 = parse_env(ENV_API_CHECK_INTERVAL, &value)?;
            if seconds < MIN_POLL_SECONDS {
                return Err(crate::BeaconError::Config(format!(
                    "{} must be at least {} second",
                    ENV_API_CHECK_INTERVAL, MIN_POLL_SECONDS
                )));
            }
            self.monitor.check_interval_seconds = seconds;
        }
        if let Some(value) = lookup(ENV_MONITOR_BASE_URL) {
            self.monitor.base_url = Some(value);
        }
        if let Some(value) = lookup(ENV_PORT) {
            self.server.port = parse_env(ENV_PORT, &value)?;
        }
        Ok(())
    }

    fn upsert_channel(&mut self, channel: ChannelConfig) {
        self.channels.retain(|c| c.kind() != channel.kind());
        self.channels.push(channel);
    }

    /// Channels with complete credentials
    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.is_enabled())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T> {
    value.trim().parse().map_err(|_| {
        crate::BeaconError::Config(format!("{} has invalid value '{}'", key, value))
    })
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::BeaconError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
