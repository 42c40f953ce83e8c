//! Channel trait and the messages channels deliver

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::NotificationBatch;
use crate::status::HealthState;

const COLOR_UP: u32 = 0x2E_CC_71;
const COLOR_DOWN: u32 = 0xE7_4C_3C;
const COLOR_ALL_CLEAR: u32 = 0x34_98_DB;

/// The outbound integrations a message can be delivered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Discord,
    Slack,
    Telegram,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Discord => write!(f, "discord"),
            ChannelKind::Slack => write!(f, "slack"),
            ChannelKind::Telegram => write!(f, "telegram"),
        }
    }
}

/// What a status alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    StatusChanged {
        previous: HealthState,
        current: HealthState,
    },
    AllClear,
}

/// A name/value pair rendered as an embed field or attachment field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl AlertField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }
}

/// Rich details attached to health status messages
#[derive(Debug, Clone, PartialEq)]
pub struct StatusAlert {
    pub title: String,
    pub kind: AlertKind,
    pub fields: Vec<AlertField>,
    pub timestamp: DateTime<Utc>,
}

impl StatusAlert {
    /// Embed color: green when up, red when down, blue for the periodic all-clear
    pub fn color(&self) -> u32 {
        match self.kind {
            AlertKind::AllClear => COLOR_ALL_CLEAR,
            AlertKind::StatusChanged {
                current: HealthState::Up,
                ..
            } => COLOR_UP,
            AlertKind::StatusChanged { .. } => COLOR_DOWN,
        }
    }
}

/// A message to be delivered to every configured channel
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub alert: Option<StatusAlert>,
    /// Source of a usage summary, for channels that must escape client text
    pub batch: Option<NotificationBatch>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alert: None,
            batch: None,
        }
    }

    pub fn with_alert(text: impl Into<String>, alert: StatusAlert) -> Self {
        Self {
            text: text.into(),
            alert: Some(alert),
            batch: None,
        }
    }

    pub fn summary(batch: NotificationBatch) -> Self {
        Self {
            text: batch.summary(),
            alert: None,
            batch: Some(batch),
        }
    }
}

/// One outbound webhook or bot integration
#[async_trait]
pub trait Channel: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ChannelKind;

    /// Deliver a message with a single HTTP request
    async fn send(&self, message: &Message) -> crate::Result<()>;
}
