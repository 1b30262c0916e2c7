//! Messaging HTTP API
//!
//! HTTP handlers for conversation history and presence queries. Live
//! messaging runs over the WebSocket session; see `backend::session`.

pub mod handlers;

pub use handlers::{conversation_history, online_users};
