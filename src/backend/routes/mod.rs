//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//! Routes are organized by functionality into focused submodules.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! ├── chat_routes.rs  - WebSocket and health check
//! └── api_routes.rs   - Authenticated HTTP API
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use pulsechat::backend::routes::create_router;
//! use pulsechat::backend::server::config::ServerConfig;
//! use pulsechat::backend::server::state::AppState;
//!
//! let router = create_router(AppState::in_memory(ServerConfig::default()));
//! ```

pub mod api_routes;
pub mod chat_routes;
pub mod router;

pub use router::create_router;
