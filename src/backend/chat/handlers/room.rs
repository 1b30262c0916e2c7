/**
 * Room Handler
 *
 * Implements `join_room`: attach a connection to an existing conversation,
 * or create a conversation from a participant list, and subscribe the
 * connection to the conversation's room channel.
 *
 * # Event Flow
 *
 * 1. Resolve the conversation (lookup by id, or validate + create)
 * 2. Subscribe the connection to `conversation_{id}`
 * 3. Record membership in the presence store
 * 4. Notify every other participant on their personal channel
 * 5. Return the conversation to the caller
 */

use chrono::Utc;

use crate::backend::error::BackendError;
use crate::backend::realtime::Channel;
use crate::backend::server::state::AppState;
use crate::backend::session::SessionContext;
use crate::shared::event::{ConversationUpdateKind, RealtimeEvent};
use crate::shared::messaging::{participant_set, Conversation};
use crate::shared::protocol::JoinRoomRequest;

pub const ACCESS_DENIED: &str = "Conversation not found or access denied";
pub const USERS_NOT_FOUND: &str = "One or more users not found";

/// Handle `join_room`
///
/// # Arguments
///
/// * `state` - Application state
/// * `session` - The calling connection
/// * `request` - Either a conversation id, or the participants of a new conversation
///
/// # Returns
///
/// The joined conversation
///
/// # Errors
///
/// * `AccessDenied` - explicit id that does not exist or excludes the caller
/// * `Validation` - empty participant list, or no participant besides the caller
/// * `NotFound` - a participant id does not name an existing user
pub async fn join_room(
    state: &AppState,
    session: &SessionContext,
    request: JoinRoomRequest,
) -> Result<Conversation, BackendError> {
    let user_id = session.user_id;

    let (conversation, kind) = match request.conversation_id {
        Some(conversation_id) => {
            let conversation = state
                .store
                .find_conversation_for_participant(conversation_id, user_id)
                .await?
                .ok_or_else(|| BackendError::access_denied(ACCESS_DENIED))?;
            (conversation, ConversationUpdateKind::UserJoined)
        }
        None => {
            let participants = participant_set(user_id, &request.participant_ids)?;
            let found = state.store.count_users(&participants).await?;
            if found != participants.len() {
                return Err(BackendError::not_found(USERS_NOT_FOUND));
            }
            let conversation = state
                .store
                .create_conversation(Conversation::new(participants))
                .await?;
            tracing::info!(
                "[Chat] User {} created conversation {} with {} participants",
                user_id,
                conversation.id,
                conversation.participants.len()
            );
            (conversation, ConversationUpdateKind::ConversationCreated)
        }
    };

    state
        .hub
        .subscribe(session.connection_id, Channel::Conversation(conversation.id));
    state
        .presence
        .join_room(conversation.id, user_id, Utc::now())
        .await?;

    let update = RealtimeEvent::ConversationUpdate {
        kind,
        conversation: conversation.clone(),
        user_id,
    };
    for participant in conversation.others(user_id) {
        state
            .hub
            .emit_to(Channel::User(participant), &update, Some(session.connection_id));
    }

    tracing::debug!("[Chat] User {} joined room {}", user_id, conversation.id);
    Ok(conversation)
}
