//! Request Middleware
//!
//! Extractors shared by the HTTP API routes.

pub mod auth;

pub use auth::AuthUser;
