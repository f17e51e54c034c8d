//! Chat front ends for the bot.
//!
//! # Module Structure
//!
//! - `polling` - Telegram long polling (default)
//! - `handlers` - Telegram webhook and health endpoints
//! - `console` - stdin/stdout for local use

mod console;
mod handlers;
mod polling;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use color_eyre::eyre::Result;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use runbot_core::{Bot, Config, TelegramClient};

// =============================================================================
// Application State
// =============================================================================

/// Shared state for the webhook server.
pub struct AppState {
    pub bot: Bot,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` value.
    pub secret: String,
}

/// Where chat messages come from.
pub enum FrontEnd {
    Polling,
    Webhook,
    Console,
}

// =============================================================================
// Entry Point
// =============================================================================

/// Build the bot for the chosen front end and run until shutdown.
pub async fn start(config: Config, front_end: FrontEnd) -> Result<()> {
    match front_end {
        FrontEnd::Console => {
            let bot = Bot::from_config(&config, Arc::new(console::ConsoleSender))?;
            console::run(bot).await
        }
        FrontEnd::Polling => {
            let client = Arc::new(TelegramClient::from_config(&config.bot)?);
            let bot = Bot::from_config(&config, client.clone())?;
            publish_menu(&bot).await;
            polling::run(bot, client).await
        }
        FrontEnd::Webhook => {
            let secret = config.bot.require_webhook_secret()?.to_string();
            let client = Arc::new(TelegramClient::from_config(&config.bot)?);
            match &config.bot.webhook_url {
                Some(url) => client.set_webhook(url, &secret).await?,
                None => info!("bot.webhook_url unset, register the webhook with the same secret yourself"),
            }
            let bot = Bot::from_config(&config, client)?;
            publish_menu(&bot).await;
            start_webhook(bot, secret, config.bot.webhook_port).await
        }
    }
}

async fn publish_menu(bot: &Bot) {
    match bot.publish_menu().await {
        Ok(()) => info!(commands = bot.registry().len(), "command menu published"),
        Err(e) => warn!(error = %e, "failed to publish command menu"),
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handlers::webhook))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn start_webhook(bot: Bot, secret: String, port: u16) -> Result<()> {
    let app = router(Arc::new(AppState { bot, secret }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "webhook listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
