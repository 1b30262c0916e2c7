//! Chat Handlers Module
//!
//! Protocol event handlers invoked by the session dispatcher. Each handler
//! takes the application state, the calling connection, and the decoded
//! payload, and returns the value acknowledged to the caller. Errors are
//! turned into `{ success: false, ... }` acknowledgements by the dispatcher
//! and never end the session.
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs      - Module exports and documentation
//! ├── room.rs     - join_room
//! ├── message.rs  - send_message
//! ├── receipt.rs  - receive_message (read receipts)
//! └── typing.rs   - typing_start / typing_stop
//! ```

/// Conversation membership
pub mod room;

/// Message send and fan-out
pub mod message;

/// Read receipts
pub mod receipt;

/// Typing indicators
pub mod typing;

pub use message::send_message;
pub use receipt::receive_message;
pub use room::join_room;
pub use typing::{typing_start, typing_stop};
