//! Real-time Update Module
//!
//! Fan-out of server events to live WebSocket connections.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs  - Channel addressing
//! └── hub.rs  - Connection registry and fan-out
//! ```
//!
//! # Example
//!
//! ```rust
//! use pulsechat::backend::realtime::{Channel, Hub};
//! use pulsechat::shared::RealtimeEvent;
//! use uuid::Uuid;
//!
//! let hub = Hub::default();
//! let user_id = Uuid::new_v4();
//! let (connection_id, _outbound) = hub.register(user_id);
//! hub.subscribe(connection_id, Channel::User(user_id));
//! hub.emit_to(Channel::User(user_id), &RealtimeEvent::UserOnline { user_id }, None);
//! ```

use std::fmt;
use uuid::Uuid;

/// Connection registry and fan-out
pub mod hub;

pub use hub::Hub;

/// Identifier of one live connection
pub type ConnectionId = Uuid;

/// Address of a group of connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Personal channel of a user
    User(Uuid),
    /// Room channel of a conversation
    Conversation(Uuid),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::User(id) => write!(f, "user_{}", id),
            Channel::Conversation(id) => write!(f, "conversation_{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        let id = Uuid::new_v4();
        assert_eq!(Channel::User(id).to_string(), format!("user_{}", id));
        assert_eq!(Channel::Conversation(id).to_string(), format!("conversation_{}", id));
    }
}
