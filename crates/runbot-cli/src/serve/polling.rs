//! Telegram long polling.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use tracing::{info, warn};

use runbot_core::{Bot, TelegramClient};

/// Pause after a failed poll before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Poll for updates and handle them one at a time until Ctrl+C.
pub async fn run(bot: Bot, client: Arc<TelegramClient>) -> Result<()> {
    info!(commands = bot.registry().len(), "polling for updates, press Ctrl+C to stop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut offset = 0;

    loop {
        let updates = tokio::select! {
            result = client.get_updates(offset) => result,
            _ = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(message) = update.into_incoming() {
                        bot.handle(message).await;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "polling failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}
