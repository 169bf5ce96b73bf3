use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use keystone_core::messages::MessageService;

use super::respond;
use crate::handlers::health::health_check;
use crate::state::AppState;

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router(messages: &Arc<MessageService>) -> Router<AppState> {
    Router::new().route(
        "/health",
        respond(messages, "health.check").apply(get(health_check)),
    )
}
