//! Messaging HTTP Handlers
//!
//! Read-only HTTP endpoints next to the WebSocket protocol: conversation
//! history and the online user list. Both require a bearer token.
//!
//! The online list also names users who are offline now but were seen in
//! the last five minutes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::chat::handlers::room::ACCESS_DENIED;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::backend::store::history_limit;
use crate::shared::messaging::MessageView;

/// Query parameters for conversation history
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    /// Only messages created strictly before this instant
    pub before: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub conversation_id: Uuid,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<Uuid>,
    /// Offline, but active within the recent-activity window
    pub recently_active: Vec<Uuid>,
}

/// `GET /api/conversations/{id}/messages`
///
/// # Returns
///
/// Up to `limit` messages (default 50, max 200), oldest first
///
/// # Errors
///
/// * `401 Unauthorized` - missing or invalid token
/// * `403 Forbidden` - caller is not a participant
pub async fn conversation_history(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, BackendError> {
    state
        .store
        .find_conversation_for_participant(conversation_id, identity.user_id)
        .await?
        .ok_or_else(|| BackendError::access_denied(ACCESS_DENIED))?;

    let messages = state
        .store
        .messages_for_conversation(conversation_id, history_limit(query.limit), query.before)
        .await?;

    tracing::debug!(
        "[Server] History for {}: {} messages for {}",
        conversation_id,
        messages.len(),
        identity.user_id
    );
    Ok(Json(HistoryResponse {
        conversation_id,
        messages,
    }))
}

/// `GET /api/presence/online`
pub async fn online_users(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
) -> Result<Json<OnlineUsersResponse>, BackendError> {
    let mut users = state.presence.online_users().await?;
    users.sort();

    let now = Utc::now();
    let mut recently_active: Vec<Uuid> = state
        .store
        .find_active_users()
        .await?
        .into_iter()
        .filter(|user| user.recently_active(now) && users.binary_search(&user.id).is_err())
        .map(|user| user.id)
        .collect();
    recently_active.sort();

    Ok(Json(OnlineUsersResponse {
        users,
        recently_active,
    }))
}
