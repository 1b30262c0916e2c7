//! Session Module
//!
//! One session per authenticated WebSocket connection. The session layer
//! authenticates the handshake, performs the connect and disconnect
//! bookkeeping, and dispatches decoded client frames to the chat handlers.
//!
//! # Module Structure
//!
//! ```text
//! session/
//! ├── mod.rs      - SessionContext
//! ├── manager.rs  - authenticate / on_connect / on_disconnect / dispatch
//! └── socket.rs   - Axum upgrade handler, handshake, reader and writer tasks
//! ```

use uuid::Uuid;

use crate::backend::realtime::ConnectionId;

/// Session lifecycle and frame dispatch
pub mod manager;

/// WebSocket transport
pub mod socket;

pub use manager::{LiveSession, SessionManager};
pub use socket::ws_handler;

/// The calling connection, as seen by protocol handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub connection_id: ConnectionId,
    pub user_id: Uuid,
    pub username: String,
}
