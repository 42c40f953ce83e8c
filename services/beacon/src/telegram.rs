//! Telegram bot channel

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::channel::{Channel, ChannelKind, Message};
use crate::event::fit_to_limit;
use crate::io::HttpClient;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this
const MAX_TEXT_CHARS: usize = 4096;

/// Escape the characters legacy Markdown treats as entity delimiters.
///
/// An unbalanced delimiter makes Telegram reject the whole message.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Sends messages to a Telegram chat through the Bot API
pub struct TelegramChannel {
    bot_token: String,
    chat_id: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            http,
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, self.bot_token)
    }

    /// Build the sendMessage body. Alert fields are appended as text lines.
    pub fn payload(chat_id: &str, message: &Message) -> Value {
        let text = match &message.batch {
            Some(batch) => batch.render(escape_markdown),
            None => message.text.clone(),
        };
        // Telegram's legacy Markdown marks bold with single asterisks
        let mut text = text.replace("**", "*");
        if let Some(alert) = &message.alert {
            text.push_str(&format!("\n\n*{}*", alert.title));
            for field in &alert.fields {
                text.push_str(&format!("\n*{}:* {}", field.name, field.value));
            }
        }

        json!({
            "chat_id": chat_id,
            "text": fit_to_limit(&text, MAX_TEXT_CHARS),
            "parse_mode": "Markdown",
        })
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn send(&self, message: &Message) -> crate::Result<()> {
        let body = Self::payload(&self.chat_id, message);
        let response = self.http.post_json(&self.send_message_url(), &body).await?;

        if response.status != 200 {
            return Err(crate::BeaconError::Channel(format!(
                "Telegram API returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Telegram notification sent to chat {}", self.chat_id);
        Ok(())
    }
}
