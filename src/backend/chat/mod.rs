//! Chat Backend Module
//!
//! Conversation membership, message delivery, read receipts and typing
//! indicators for live sessions.
//!
//! # Example
//!
//! ```rust,no_run
//! use pulsechat::backend::chat::handlers::send_message;
//! use pulsechat::backend::server::state::AppState;
//! use pulsechat::backend::session::SessionContext;
//! use pulsechat::shared::protocol::SendMessageRequest;
//!
//! # async fn example(state: AppState, session: SessionContext, conversation_id: uuid::Uuid) {
//! let request = SendMessageRequest { conversation_id, content: "Hello!".into() };
//! let message = send_message(&state, &session, request).await;
//! # }
//! ```

/// Protocol event handlers
pub mod handlers;

pub use handlers::{join_room, receive_message, send_message, typing_start, typing_stop};
