/**
 * Chat Route Handlers
 *
 * Real-time endpoints.
 *
 * # Routes
 *
 * - `GET /ws` - WebSocket upgrade; token via `Authorization`, `?token=`,
 *   or an `authenticate` first frame
 * - `GET /healthcheck` - Liveness probe
 */

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::backend::server::state::AppState;
use crate::backend::session::ws_handler;

/// Liveness probe
pub async fn healthcheck() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": Utc::now(),
    }))
}

/// Configure chat-related routes
pub fn configure_chat_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/ws", get(ws_handler))
        .route("/healthcheck", get(healthcheck))
}
