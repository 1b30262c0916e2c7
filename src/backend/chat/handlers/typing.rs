/**
 * Typing Indicator Handlers
 *
 * Typing indicators let room subscribers see when someone is typing.
 *
 * # Event Flow
 *
 * 1. Client sends `typing_start` or `typing_stop` with a conversation id
 * 2. `typing_start` writes the `typing:{user}:{conversation}` marker first,
 *    so a failed write is never announced
 * 3. Server broadcasts `user_typing` to the room, except the sender
 * 4. `typing_stop` deletes the marker after broadcasting
 *
 * The marker expires after five seconds on its own, so a lost
 * `typing_stop` or an abrupt disconnect never leaves a stale indicator.
 */

use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::presence::TYPING_TTL;
use crate::backend::realtime::Channel;
use crate::backend::server::state::AppState;
use crate::backend::session::SessionContext;
use crate::shared::event::RealtimeEvent;

/// Handle `typing_start`
///
/// # Returns
///
/// `false` without side effects when the caller is not a participant
pub async fn typing_start(
    state: &AppState,
    session: &SessionContext,
    conversation_id: Uuid,
) -> Result<bool, BackendError> {
    let is_participant = state
        .store
        .find_conversation_for_participant(conversation_id, session.user_id)
        .await?
        .is_some();
    if !is_participant {
        tracing::debug!(
            "[Chat] Ignoring typing_start from non-participant {} in {}",
            session.user_id,
            conversation_id
        );
        return Ok(false);
    }

    state
        .presence
        .set_typing(session.user_id, conversation_id, TYPING_TTL)
        .await?;
    state.hub.emit_to(
        Channel::Conversation(conversation_id),
        &RealtimeEvent::typing(session.user_id, conversation_id, true),
        Some(session.connection_id),
    );
    Ok(true)
}

/// Handle `typing_stop`
pub async fn typing_stop(
    state: &AppState,
    session: &SessionContext,
    conversation_id: Uuid,
) -> Result<bool, BackendError> {
    state.hub.emit_to(
        Channel::Conversation(conversation_id),
        &RealtimeEvent::typing(session.user_id, conversation_id, false),
        Some(session.connection_id),
    );
    state
        .presence
        .clear_typing(session.user_id, conversation_id)
        .await?;
    Ok(true)
}
