/**
 * Message Send Handler
 *
 * Implements `send_message`. A message is persisted, becomes the
 * conversation's latest message, and is fanned out:
 *
 * - the sending connection gets `message_delivered`
 * - every other participant's personal channel gets `receive_message`,
 *   whether or not they have the room open
 *
 * The sender never receives a second copy.
 *
 * # Consistency
 *
 * Message creation and the last-message pointer update are separate
 * writes. If the pointer update fails the message stays persisted and the
 * caller gets a delivery error; the pointer catches up with the next
 * message in the conversation.
 */

use crate::backend::chat::handlers::room::ACCESS_DENIED;
use crate::backend::error::BackendError;
use crate::backend::realtime::Channel;
use crate::backend::server::state::AppState;
use crate::backend::session::SessionContext;
use crate::shared::event::RealtimeEvent;
use crate::shared::messaging::{validate_content, ChatMessage, MessageView};
use crate::shared::protocol::SendMessageRequest;

pub const SEND_FAILED: &str = "Failed to send message";

/// Persistence failures are reported to the caller with a fixed message
fn delivery_error(err: BackendError) -> BackendError {
    match err {
        BackendError::Infrastructure { .. } | BackendError::SerializationError(_) => {
            tracing::error!("[Chat] Message delivery failed: {}", err);
            BackendError::infrastructure(SEND_FAILED)
        }
        other => other,
    }
}

/// Handle `send_message`
///
/// # Returns
///
/// The persisted message with its sender resolved
///
/// # Errors
///
/// * `Validation` - empty or oversized content
/// * `AccessDenied` - caller is not a participant
/// * `Infrastructure` - "Failed to send message"
pub async fn send_message(
    state: &AppState,
    session: &SessionContext,
    request: SendMessageRequest,
) -> Result<MessageView, BackendError> {
    validate_content(&request.content)?;

    let conversation = state
        .store
        .find_conversation_for_participant(request.conversation_id, session.user_id)
        .await
        .map_err(delivery_error)?
        .ok_or_else(|| BackendError::access_denied(ACCESS_DENIED))?;

    let message = state
        .store
        .create_message(ChatMessage::new(
            conversation.id,
            session.user_id,
            request.content,
        ))
        .await
        .map_err(delivery_error)?;

    state
        .store
        .set_last_message(conversation.id, message.id)
        .await
        .map_err(delivery_error)?;

    let view = state
        .store
        .find_message_view(message.id)
        .await
        .map_err(delivery_error)?
        .ok_or_else(|| delivery_error(BackendError::infrastructure("Message vanished after insert")))?;

    state.hub.send_to(
        session.connection_id,
        RealtimeEvent::MessageDelivered {
            conversation_id: conversation.id,
            message: view.clone(),
        },
    );

    let incoming = RealtimeEvent::ReceiveMessage {
        conversation_id: conversation.id,
        message: view.clone(),
    };
    for participant in conversation.others(session.user_id) {
        state.hub.emit_to(Channel::User(participant), &incoming, None);
    }

    tracing::debug!(
        "[Chat] Message {} sent to conversation {} by {}",
        view.id,
        conversation.id,
        session.user_id
    );
    Ok(view)
}
