//! HTTP route handlers for the webhook server.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{debug, warn};

use runbot_core::notify::Update;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub commands: usize,
    pub active_runs: usize,
    pub capacity: usize,
}

/// Header Telegram fills with the secret given to `setWebhook`.
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// POST `/webhook` - One Telegram update.
///
/// Requests without the configured secret get 401 and are not dispatched.
/// Authenticated updates always get 200 so Telegram does not redeliver
/// updates the bot chose to ignore.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(provided, &state.secret) {
        warn!(update_id = update.update_id, "rejecting webhook call without a valid secret");
        return StatusCode::UNAUTHORIZED;
    }

    let update_id = update.update_id;
    match update.into_incoming() {
        Some(message) => state.bot.handle(message).await,
        None => debug!(update_id, "ignoring update without text"),
    }
    StatusCode::OK
}

/// Compares every byte so the check does not leak a matching prefix.
fn secret_matches(provided: Option<&str>, expected: &str) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    provided.len() == expected.len()
        && provided
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// GET `/health` - Liveness plus queue occupancy.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let queue = &state.bot.services().queue;
    Json(HealthResponse {
        status: "ok",
        commands: state.bot.registry().len(),
        active_runs: queue.active_count(),
        capacity: queue.capacity(),
    })
}
