//! Shared Module
//!
//! Types shared between the server and its clients: the records the engine
//! persists, the client protocol frames, and the server-originated events.
//! Everything here is plain data and serializes to JSON.

/// Server-originated real-time events
pub mod event;

/// Wire payload error types
pub mod error;

/// Client protocol frames
pub mod protocol;

/// Conversations, messages, users, scheduled messages
pub mod messaging;

pub use error::SharedError;
pub use event::{ConversationUpdateKind, RealtimeEvent};
pub use protocol::{ClientEvent, ClientFrame};
