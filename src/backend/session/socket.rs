/**
 * WebSocket Transport
 *
 * `GET /ws` upgrades to a WebSocket carrying JSON text frames.
 *
 * # Handshake
 *
 * A token presented on the upgrade request (`Authorization: Bearer <t>` or
 * `?token=<t>`) is verified before upgrading; a bad token is answered with
 * HTTP 401. Without one, the first frame must be
 *
 * ```json
 * {"event": "authenticate", "data": {"token": "..."}}
 * ```
 *
 * and must arrive within the handshake timeout, otherwise the socket is
 * closed with code 4401.
 *
 * # Tasks
 *
 * After the handshake the socket is split: a writer task drains the
 * connection's outbound queue into the sink while the reader loop
 * dispatches frames in arrival order.
 */

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::backend::auth::{bearer_token, SessionIdentity};
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::backend::session::SessionManager;
use crate::shared::{ClientEvent, ClientFrame, RealtimeEvent};

/// Close code sent when the handshake fails
pub const CLOSE_UNAUTHORIZED: u16 = 4401;

/// Query parameters accepted on the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Token from the upgrade request, header first
fn presented_token(headers: &HeaderMap, params: ConnectParams) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
        .or(params.token)
}

/// Upgrade handler for `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> Response {
    let manager = SessionManager::new(state);

    let identity = match presented_token(&headers, params) {
        Some(token) => match manager.authenticate(&token) {
            Ok(identity) => Some(identity),
            Err(err) => {
                tracing::warn!("[Auth] Rejected upgrade: {}", err);
                return err.into_response();
            }
        },
        None => None,
    };

    ws.on_upgrade(move |socket| run_socket(manager, socket, identity))
        .into_response()
}

/// Wait for an `authenticate` frame
///
/// # Returns
///
/// The verified identity and the ack id of the authenticate frame, or the
/// close reason
async fn handshake(
    manager: &SessionManager,
    socket: &mut WebSocket,
) -> Result<(SessionIdentity, Option<u64>), String> {
    let timeout = manager.state().config.handshake_timeout();

    let first_text = tokio::time::timeout(timeout, async {
        while let Some(frame) = socket.recv().await {
            match frame {
                Ok(Message::Text(text)) => return Some(text.to_string()),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
        None
    })
    .await
    .map_err(|_| "Authentication timeout".to_string())?
    .ok_or_else(|| "Connection closed before authentication".to_string())?;

    let (event, ack) = ClientFrame::parse(&first_text)
        .and_then(ClientFrame::decode)
        .map_err(|_| "Authentication required".to_string())?;

    match event {
        ClientEvent::Authenticate(payload) => manager
            .authenticate(&payload.token)
            .map(|identity| (identity, ack))
            .map_err(|err: BackendError| err.message()),
        _ => Err("Authentication required".to_string()),
    }
}

async fn close_unauthorized(mut socket: WebSocket, reason: String) {
    tracing::warn!("[Auth] Closing unauthenticated socket: {}", reason);
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_UNAUTHORIZED,
            reason: reason.into(),
        })))
        .await;
}

async fn run_socket(manager: SessionManager, mut socket: WebSocket, identity: Option<SessionIdentity>) {
    let (identity, auth_ack) = match identity {
        Some(identity) => (identity, None),
        None => match handshake(&manager, &mut socket).await {
            Ok(authenticated) => authenticated,
            Err(reason) => {
                close_unauthorized(socket, reason).await;
                return;
            }
        },
    };

    let (session, mut outbound) = manager.on_connect(identity).await;
    let context = session.context.clone();

    if let Some(id) = auth_ack {
        manager.state().hub.send_to(
            context.connection_id,
            RealtimeEvent::Ack {
                id,
                response: serde_json::json!({
                    "success": true,
                    "user_id": context.user_id,
                    "username": context.username,
                }),
            },
        );
    }

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!("[Session] Failed to serialize {}: {}", event.name(), err);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => manager.dispatch(&context, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!("[Session] Socket error on {}: {}", context.connection_id, err);
                break;
            }
        }
    }

    manager.on_disconnect(session).await;
    writer.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_presented_token_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let params = ConnectParams {
            token: Some("from-query".into()),
        };
        assert_eq!(presented_token(&headers, params).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_presented_token_falls_back_to_query() {
        let params = ConnectParams {
            token: Some("from-query".into()),
        };
        assert_eq!(
            presented_token(&HeaderMap::new(), params).as_deref(),
            Some("from-query")
        );
        assert_eq!(presented_token(&HeaderMap::new(), ConnectParams::default()), None);
    }
}
