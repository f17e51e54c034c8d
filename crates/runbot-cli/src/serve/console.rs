//! Local front end: commands from stdin, replies on stdout.

use std::time::Duration;

use async_trait::async_trait;
use color_eyre::eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use runbot_core::{Bot, IncomingMessage, MessageSender, NotifyError};

const CONSOLE_CHAT_ID: i64 = 0;
const CONSOLE_USER_ID: i64 = 0;

/// Prints every message to stdout.
pub struct ConsoleSender;

#[async_trait]
impl MessageSender for ConsoleSender {
    async fn send(&self, _chat_id: i64, text: &str) -> Result<(), NotifyError> {
        println!("{}\n", text);
        Ok(())
    }
}

/// Handle stdin lines until EOF, then wait for active runs to finish.
pub async fn run(bot: Bot) -> Result<()> {
    println!(
        "runbot console: {} commands loaded, try /help (Ctrl+D to quit)\n",
        bot.registry().len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        bot.handle(IncomingMessage::new(CONSOLE_CHAT_ID, CONSOLE_USER_ID, line))
            .await;
    }

    let queue = &bot.services().queue;
    if queue.active_count() > 0 {
        info!(active = queue.active_count(), "waiting for active runs to finish");
    }
    while queue.active_count() > 0 {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    Ok(())
}
