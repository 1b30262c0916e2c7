//! Pulsechat - Main Library
//!
//! Pulsechat is a real-time messaging and presence engine. Clients hold a
//! persistent WebSocket session; the server authenticates it, tracks who is
//! online, routes messages between conversation participants, relays read
//! receipts and typing indicators, and delivers scheduled auto-messages
//! through a durable work queue.
//!
//! # Module Structure
//!
//! - **`shared`** - Plain data shared with clients
//!   - Conversations, messages, users, auto-messages
//!   - Client protocol frames and server events
//!   - Payload validation errors
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP and WebSocket server
//!   - Session lifecycle and protocol handlers
//!   - Presence (Redis or memory), store and queue (PostgreSQL or memory)
//!   - Auto-message composition, enqueue and consumer jobs
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - Enables the backend module and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use pulsechat::backend::server::{config::ServerConfig, init::create_app};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::load()?;
//! let (app, jobs) = create_app(config).await;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! jobs.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - Shared collaborators live behind `Arc<dyn Trait + Send + Sync>`
//! - The hub uses `DashMap` and bounded `mpsc` queues per connection
//! - No lock is held across an `.await` that reaches a backend
//!
//! # Error Handling
//!
//! - `shared::SharedError` for payload validation and decoding
//! - `backend::BackendError` for server failures, with HTTP and wire mappings

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
