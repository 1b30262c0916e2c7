//! Backend Module
//!
//! All server-side code: the WebSocket session layer, protocol handlers,
//! presence, persistence, the auto-message pipeline and the HTTP surface.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`session`** - WebSocket handshake, session lifecycle, frame dispatch
//! - **`chat`** - `join_room`, `send_message`, read receipts, typing
//! - **`realtime`** - In-process fan-out hub with per-user and per-room channels
//! - **`presence`** - Online set, socket map, room membership, typing markers
//! - **`store`** - Users, conversations, messages, auto-messages
//! - **`queue`** - Durable at-least-once work queue
//! - **`jobs`** - Composition, enqueue and consumer tasks
//! - **`auth`** - Session token verification
//! - **`messaging`** - HTTP history and presence endpoints
//! - **`middleware`** - Request extractors
//! - **`error`** - Backend error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── session/        - Session lifecycle and WebSocket transport
//! ├── chat/           - Protocol event handlers
//! ├── realtime/       - Fan-out hub
//! ├── presence/       - Presence store (memory, Redis)
//! ├── store/          - Document store (memory, PostgreSQL)
//! ├── queue/          - Work queue (memory, PostgreSQL)
//! ├── jobs/           - Auto-message pipeline
//! ├── auth/           - Token verification
//! ├── messaging/      - HTTP API handlers
//! ├── middleware/     - Request extractors
//! └── error/          - Error types
//! ```
//!
//! # State Management
//!
//! `AppState` is built once at startup and passed to every handler, session
//! and job. It holds the store, presence store and queue behind trait
//! objects so each can be swapped between the networked and in-memory
//! implementations.
//!
//! # Error Handling
//!
//! - `BackendError` for every server-side failure
//! - JSON HTTP responses via `IntoResponse`
//! - `{ success: false, error, code }` acknowledgements on the WebSocket

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Session lifecycle and WebSocket transport
pub mod session;

/// Chat protocol handlers
pub mod chat;

/// Real-time fan-out
pub mod realtime;

/// Presence tracking
pub mod presence;

/// Persistent documents
pub mod store;

/// Durable work queue
pub mod queue;

/// Auto-message pipeline
pub mod jobs;

/// Backend error types
pub mod error;

/// Token verification
pub mod auth;

/// Request extractors
pub mod middleware;

/// HTTP API handlers
pub mod messaging;

/// Re-export commonly used types
pub use error::BackendError;
pub use server::{create_app, AppState, ServerConfig};
pub use session::SessionManager;
