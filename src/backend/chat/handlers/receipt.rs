//! Read receipt handler (`receive_message`)

use crate::backend::chat::handlers::room::ACCESS_DENIED;
use crate::backend::error::BackendError;
use crate::backend::realtime::Channel;
use crate::backend::server::state::AppState;
use crate::backend::session::SessionContext;
use crate::shared::event::RealtimeEvent;
use crate::shared::protocol::ReadReceiptRequest;

/// Mark a message read by the caller and tell the room
///
/// Repeating the call is a no-op on the read set but re-broadcasts the
/// receipt. Returns `false` when the message does not exist in the
/// conversation.
pub async fn receive_message(
    state: &AppState,
    session: &SessionContext,
    request: ReadReceiptRequest,
) -> Result<bool, BackendError> {
    state
        .store
        .find_conversation_for_participant(request.conversation_id, session.user_id)
        .await?
        .ok_or_else(|| BackendError::access_denied(ACCESS_DENIED))?;

    let updated = state
        .store
        .add_reader(request.conversation_id, request.message_id, session.user_id)
        .await?;
    if !updated {
        tracing::debug!("[Chat] Read receipt for unknown message {}", request.message_id);
        return Ok(false);
    }

    let receipt = RealtimeEvent::read_receipt(
        session.user_id,
        request.conversation_id,
        request.message_id,
    );
    state.hub.emit_to(
        Channel::Conversation(request.conversation_id),
        &receipt,
        Some(session.connection_id),
    );
    Ok(true)
}
