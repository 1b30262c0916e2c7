/**
 * API Route Handlers
 *
 * HTTP API endpoints, all requiring `Authorization: Bearer <token>`.
 *
 * # Routes
 *
 * - `GET /api/conversations/{id}/messages` - Conversation history
 * - `GET /api/presence/online` - Online user ids
 */

use axum::{routing::get, Router};

use crate::backend::messaging::handlers::{conversation_history, online_users};
use crate::backend::server::state::AppState;

/// Configure API routes
///
/// # Arguments
///
/// * `router` - The router to add routes to
///
/// # Returns
///
/// Router with API routes configured
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/conversations/{id}/messages", get(conversation_history))
        .route("/api/presence/online", get(online_users))
}
