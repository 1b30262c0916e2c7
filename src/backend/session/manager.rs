/**
 * Session Manager
 *
 * Owns the lifecycle of a live session:
 *
 * - `authenticate` turns a handshake token into a `SessionIdentity`
 * - `on_connect` registers the connection, counts the session and starts
 *   the heartbeat; `user_online` goes out only for a user's first session
 * - `dispatch` decodes one client frame and runs its handler
 * - `on_disconnect` undoes the connect bookkeeping; the user goes offline
 *   only when their last session closes
 *
 * Handler failures are reported back on the connection and never end the
 * session. Disconnect cleanup attempts every step even when earlier steps
 * fail.
 */

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::auth::SessionIdentity;
use crate::backend::chat::handlers;
use crate::backend::error::BackendError;
use crate::backend::realtime::Channel;
use crate::backend::server::state::AppState;
use crate::backend::session::SessionContext;
use crate::shared::{ClientEvent, ClientFrame, RealtimeEvent};

/// A connected session and its background heartbeat
pub struct LiveSession {
    pub context: SessionContext,
    heartbeat: JoinHandle<()>,
}

impl LiveSession {
    pub fn context(&self) -> &SessionContext {
        &self.context
    }
}

/// Session lifecycle operations over the shared application state
#[derive(Clone)]
pub struct SessionManager {
    state: AppState,
}

impl SessionManager {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Verify a handshake token
    ///
    /// # Errors
    ///
    /// `Authentication` for a missing, malformed, badly-signed or expired token
    pub fn authenticate(&self, token: &str) -> Result<SessionIdentity, BackendError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BackendError::authentication("Authentication token required"));
        }
        let identity = self.state.tokens.verify(token)?;
        tracing::debug!("[Auth] Verified token for user {}", identity.user_id);
        Ok(identity)
    }

    /// Bring an authenticated connection online
    ///
    /// # Returns
    ///
    /// The live session and the receiving end of its outbound event queue
    pub async fn on_connect(
        &self,
        identity: SessionIdentity,
    ) -> (LiveSession, mpsc::Receiver<RealtimeEvent>) {
        let user_id = identity.user_id;
        let (connection_id, outbound) = self.state.hub.register(user_id);
        let now = Utc::now();

        if let Err(err) = self.state.store.mark_user_active(user_id, now).await {
            tracing::warn!("[Session] Failed to mark user {} active: {}", user_id, err);
        }
        let sessions = match self.state.presence.add_online(user_id).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("[Session] Failed to add user {} to online set: {}", user_id, err);
                1
            }
        };
        if let Err(err) = self.state.presence.set_user_socket(user_id, connection_id).await {
            tracing::warn!("[Session] Failed to map user {} to connection: {}", user_id, err);
        }
        self.state.hub.subscribe(connection_id, Channel::User(user_id));
        if sessions == 1 {
            self.state
                .hub
                .emit_all(&RealtimeEvent::UserOnline { user_id }, Some(connection_id));
        } else {
            tracing::debug!("[Session] User {} now has {} sessions", user_id, sessions);
        }

        let heartbeat = self.spawn_heartbeat(user_id);

        tracing::info!(
            "[Session] User {} ({}) connected on {}",
            identity.username,
            user_id,
            connection_id
        );

        let session = LiveSession {
            context: SessionContext {
                connection_id,
                user_id,
                username: identity.username,
            },
            heartbeat,
        };
        (session, outbound)
    }

    /// Refresh `last_active_at` on every heartbeat tick
    fn spawn_heartbeat(&self, user_id: uuid::Uuid) -> JoinHandle<()> {
        let store = self.state.store.clone();
        let period = self.state.config.heartbeat_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = store.touch_user(user_id, Utc::now()).await {
                    tracing::warn!("[Session] Heartbeat failed for user {}: {}", user_id, err);
                }
            }
        })
    }

    /// Tear a session down
    pub async fn on_disconnect(&self, session: LiveSession) {
        session.heartbeat.abort();
        let SessionContext {
            connection_id,
            user_id,
            ..
        } = session.context;

        if let Err(err) = self.state.store.touch_user(user_id, Utc::now()).await {
            tracing::warn!("[Session] Failed to refresh activity for {}: {}", user_id, err);
        }
        let remaining = match self.state.presence.remove_online(user_id).await {
            Ok(remaining) => remaining,
            Err(err) => {
                tracing::warn!("[Session] Failed to remove {} from online set: {}", user_id, err);
                0
            }
        };
        self.state.hub.unregister(connection_id);

        if remaining == 0 {
            if let Err(err) = self.state.presence.clear_user_socket(user_id).await {
                tracing::warn!("[Session] Failed to clear socket mapping for {}: {}", user_id, err);
            }
            self.state
                .hub
                .emit_all(&RealtimeEvent::UserOffline { user_id }, None);
        } else {
            self.repoint_socket(user_id, connection_id).await;
        }

        tracing::info!(
            "[Session] User {} disconnected from {} ({} sessions left)",
            user_id,
            connection_id,
            remaining
        );
    }

    /// Move the socket mapping off a closed connection onto a live one
    async fn repoint_socket(&self, user_id: uuid::Uuid, closed: uuid::Uuid) {
        match self.state.presence.user_socket(user_id).await {
            Ok(Some(current)) if current == closed => {
                let Some(next) = self.state.hub.user_connections(user_id).into_iter().next() else {
                    return;
                };
                if let Err(err) = self.state.presence.set_user_socket(user_id, next).await {
                    tracing::warn!("[Session] Failed to remap socket for {}: {}", user_id, err);
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("[Session] Failed to read socket mapping for {}: {}", user_id, err);
            }
        }
    }

    /// Handle one text frame from an authenticated connection
    ///
    /// Replies are queued on the connection itself: an `ack` event when the
    /// frame carried an ack id, otherwise an `error` event on failure.
    pub async fn dispatch(&self, session: &SessionContext, text: &str) {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!("[Session] Malformed frame from {}: {}", session.connection_id, err);
                self.state.hub.send_to(
                    session.connection_id,
                    RealtimeEvent::Error {
                        message: err.to_string(),
                    },
                );
                return;
            }
        };

        // The envelope parsed, so a bad payload is still answered on its ack
        let frame_ack = frame.ack;
        let (event, ack) = match frame.decode() {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!("[Session] Undecodable payload from {}: {}", session.connection_id, err);
                let err = BackendError::from(err);
                let reply = match frame_ack {
                    Some(id) => RealtimeEvent::Ack {
                        id,
                        response: err.to_ack(),
                    },
                    None => RealtimeEvent::Error {
                        message: err.message(),
                    },
                };
                self.state.hub.send_to(session.connection_id, reply);
                return;
            }
        };

        let name = event.name();
        let result = self.handle_event(session, event).await;

        let reply = match (result, ack) {
            (Ok(response), Some(id)) => Some(RealtimeEvent::Ack { id, response }),
            (Ok(_), None) => None,
            (Err(err), Some(id)) => {
                tracing::debug!("[Session] {} failed for {}: {}", name, session.user_id, err);
                Some(RealtimeEvent::Ack {
                    id,
                    response: err.to_ack(),
                })
            }
            (Err(err), None) => {
                tracing::debug!("[Session] {} failed for {}: {}", name, session.user_id, err);
                Some(RealtimeEvent::Error {
                    message: err.message(),
                })
            }
        };
        if let Some(reply) = reply {
            self.state.hub.send_to(session.connection_id, reply);
        }
    }

    /// Run the handler for a decoded event
    ///
    /// # Returns
    ///
    /// The acknowledgement payload for the event
    pub async fn handle_event(
        &self,
        session: &SessionContext,
        event: ClientEvent,
    ) -> Result<serde_json::Value, BackendError> {
        let state = &self.state;
        match event {
            ClientEvent::Authenticate(_) => {
                Err(BackendError::validation("Session already authenticated"))
            }
            ClientEvent::JoinRoom(request) => {
                let conversation = handlers::join_room(state, session, request).await?;
                Ok(json!({ "success": true, "conversation": conversation }))
            }
            ClientEvent::SendMessage(request) => {
                let message = handlers::send_message(state, session, request).await?;
                Ok(json!({ "success": true, "message": message }))
            }
            ClientEvent::ReceiveMessage(request) => {
                let updated = handlers::receive_message(state, session, request).await?;
                Ok(json!(updated))
            }
            ClientEvent::TypingStart(conversation_id) => {
                let accepted = handlers::typing_start(state, session, conversation_id).await?;
                Ok(json!(accepted))
            }
            ClientEvent::TypingStop(conversation_id) => {
                let accepted = handlers::typing_stop(state, session, conversation_id).await?;
                Ok(json!(accepted))
            }
        }
    }
}
