use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{MessageSender, NotifyError};
use crate::bot::IncomingMessage;
use crate::config::{BotConfig, ConfigError};

/// Telegram limits command menu descriptions to 256 characters.
const MAX_COMMAND_DESCRIPTION: usize = 256;

/// Telegram rejects messages longer than this.
const MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram Bot API client.
pub struct TelegramClient {
    api_url: String,
    token: String,
    poll_timeout: Duration,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct BotCommand<'a> {
    command: &'a str,
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

impl Update {
    /// The text message carried by this update, if any.
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        let message = self.message?;
        let text = message.text?;
        Some(IncomingMessage {
            chat_id: message.chat.id,
            // Channel posts have no sender; fall back to the chat.
            user_id: message.from.map(|u| u.id).unwrap_or(message.chat.id),
            text,
        })
    }
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        let defaults = BotConfig::default();
        Self {
            api_url: defaults.api_url,
            token: token.into(),
            poll_timeout: Duration::from_secs(defaults.poll_timeout_secs),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &BotConfig) -> Result<Self, ConfigError> {
        let token = config.require_token()?;
        Ok(Self::new(token)
            .with_api_url(&config.api_url)
            .with_poll_timeout(Duration::from_secs(config.poll_timeout_secs)))
    }

    /// Sets the API URL (for local Bot API servers).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_url.trim_end_matches('/'),
            self.token,
            method
        )
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, NotifyError> {
        let mut request = self.client.post(self.method_url(method)).json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let status = response.status();

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| NotifyError::Parse(e.to_string()))?;

        if !status.is_success() || !parsed.ok {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message: parsed.description.unwrap_or_default(),
            });
        }

        parsed
            .result
            .ok_or_else(|| NotifyError::Parse(format!("{} returned no result", method)))
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, NotifyError> {
        let body = json!({
            "offset": offset,
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        // Leave the HTTP request room to outlive the server-side poll.
        let http_timeout = self.poll_timeout + Duration::from_secs(10);
        self.call("getUpdates", body, Some(http_timeout)).await
    }

    /// Point Telegram at `url`. Every delivery will carry `secret` in the
    /// `X-Telegram-Bot-Api-Secret-Token` header.
    pub async fn set_webhook(&self, url: &str, secret: &str) -> Result<(), NotifyError> {
        let body = json!({
            "url": url,
            "secret_token": secret,
            "allowed_updates": ["message"],
        });
        self.call::<bool>("setWebhook", body, None).await?;
        debug!(url, "webhook registered");
        Ok(())
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let text: String = text.chars().take(MAX_MESSAGE_LENGTH).collect();
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        match self.call::<serde_json::Value>("sendMessage", body, None).await {
            Ok(_) => Ok(()),
            // Test names often contain `_` or `*`, which break Markdown.
            Err(NotifyError::Api { status: 400, message }) if message.contains("parse entities") => {
                debug!(chat_id, "markdown rejected, resending as plain text");
                let body = json!({ "chat_id": chat_id, "text": text });
                self.call::<serde_json::Value>("sendMessage", body, None)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn set_commands(&self, commands: &[(String, String)]) -> Result<(), NotifyError> {
        let menu: Vec<BotCommand<'_>> = commands
            .iter()
            .filter(|(name, _)| {
                let valid = is_valid_command_name(name);
                if !valid {
                    warn!(command = %name, "command name not accepted by menu, skipping");
                }
                valid
            })
            .map(|(name, description)| BotCommand {
                command: name,
                description: description.chars().take(MAX_COMMAND_DESCRIPTION).collect(),
            })
            .collect();

        let count = menu.len();
        self.call::<bool>("setMyCommands", json!({ "commands": menu }), None)
            .await?;
        debug!(count, "command menu published");
        Ok(())
    }
}

/// Menu commands must be 1-32 characters of `a-z`, `0-9` and `_`.
fn is_valid_command_name(name: &str) -> bool {
    (1..=32).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
