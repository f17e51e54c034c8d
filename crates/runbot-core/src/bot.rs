//! Inbound message dispatch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::command::{CommandContext, CommandRegistry};
use crate::config::{Config, ConfigError};
use crate::discovery::DynamicCommandRegistrar;
use crate::notify::{MessageSender, NotifyError};
use crate::run::RunServices;

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// A text message received from a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
}

impl IncomingMessage {
    pub fn new(chat_id: i64, user_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_id,
            text: text.into(),
        }
    }
}

/// Routes chat commands to registered commands.
pub struct Bot {
    registry: Arc<CommandRegistry>,
    services: Arc<RunServices>,
    username: Option<String>,
    allowed_chats: Vec<i64>,
}

impl Bot {
    pub fn new(registry: Arc<CommandRegistry>, services: Arc<RunServices>) -> Self {
        Self {
            registry,
            services,
            username: None,
            allowed_chats: Vec::new(),
        }
    }

    /// Assemble a bot from configuration: built-ins first, then discovered
    /// commands for the configured strategy.
    pub fn from_config(config: &Config, sender: Arc<dyn MessageSender>) -> Result<Self, BotError> {
        config.validate()?;

        let mut registry = CommandRegistry::with_builtins();
        DynamicCommandRegistrar::from_config(&config.discovery)
            .register(&mut registry, config.runner.framework_path.as_deref());
        info!(commands = registry.len(), "command registry ready");

        let services = RunServices::from_config(config, sender);
        Ok(Self::new(Arc::new(registry), Arc::new(services))
            .with_username(config.bot.username.clone())
            .with_allowed_chats(config.bot.allowed_chats.clone()))
    }

    /// Only commands addressed to this username (or to nobody) are handled.
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username.map(|u| u.trim_start_matches('@').to_string());
        self
    }

    /// Empty means every chat is allowed.
    pub fn with_allowed_chats(mut self, chats: Vec<i64>) -> Self {
        self.allowed_chats = chats;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn services(&self) -> &RunServices {
        &self.services
    }

    /// Handle one inbound message.
    pub async fn handle(&self, message: IncomingMessage) {
        if !self.allowed_chats.is_empty() && !self.allowed_chats.contains(&message.chat_id) {
            debug!(chat_id = message.chat_id, "ignoring message from chat outside allow-list");
            return;
        }

        let Some((name, args)) = parse_command(&message.text, self.username.as_deref()) else {
            return;
        };

        info!(
            chat_id = message.chat_id,
            user_id = message.user_id,
            command = %name,
            args = %args,
            "command received"
        );

        let Some(command) = self.registry.resolve(&name) else {
            self.services
                .notifier
                .unknown_command(message.chat_id, &name)
                .await;
            return;
        };

        let ctx = CommandContext {
            chat_id: message.chat_id,
            user_id: message.user_id,
            registry: &self.registry,
            services: &self.services,
        };
        command.execute(&ctx, &args).await;
    }

    /// (name, description) pairs for the chat client's command menu.
    pub fn command_menu(&self) -> Vec<(String, String)> {
        self.registry.menu()
    }

    /// Publish the command menu through the notifier's sender.
    pub async fn publish_menu(&self) -> Result<(), BotError> {
        let menu = self.command_menu();
        self.services
            .notifier
            .sender()
            .set_commands(&menu)
            .await?;
        Ok(())
    }
}

/// Split `/name@bot args` into a lower-cased name and trimmed arguments.
///
/// Returns `None` for plain text and for commands addressed to another bot.
pub fn parse_command(text: &str, username: Option<&str>) -> Option<(String, String)> {
    let body = text.trim().strip_prefix('/')?;
    let (token, args) = match body.split_once(char::is_whitespace) {
        Some((token, args)) => (token, args.trim()),
        None => (body, ""),
    };

    let name = match token.split_once('@') {
        Some((name, target)) => {
            if let Some(username) = username {
                if !target.eq_ignore_ascii_case(username) {
                    return None;
                }
            }
            name
        }
        None => token,
    };

    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), args.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("/Smoke dev", None),
            Some(("smoke".to_string(), "dev".to_string()))
        );
        assert_eq!(
            parse_command("  /auth   login  replica ", None),
            Some(("auth".to_string(), "login  replica".to_string()))
        );
        assert_eq!(parse_command("/help", None), Some(("help".to_string(), String::new())));
    }

    #[test]
    fn test_parse_ignores_plain_text() {
        assert_eq!(parse_command("hello", None), None);
        assert_eq!(parse_command("/", None), None);
        assert_eq!(parse_command("/ smoke", None), None);
    }

    #[test]
    fn test_parse_bot_suffix() {
        assert_eq!(
            parse_command("/smoke@RunBot dev", Some("runbot")),
            Some(("smoke".to_string(), "dev".to_string()))
        );
        assert_eq!(parse_command("/smoke@OtherBot", Some("runbot")), None);
        assert_eq!(
            parse_command("/smoke@AnyBot", None),
            Some(("smoke".to_string(), String::new()))
        );
    }
}
