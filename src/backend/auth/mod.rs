//! Authentication Module
//!
//! Token verification for connection handshakes and authenticated HTTP
//! endpoints. Account registration and login live outside this server;
//! it only needs to know which user a token belongs to.
//!
//! # Security
//!
//! - Tokens are HS256 JWTs signed with `JWT_SECRET`
//! - `exp` is always validated
//! - Invalid tokens return 401 (HTTP) or close the socket with 4401

/// JWT token generation and validation
pub mod sessions;

pub use sessions::{bearer_token, Claims, SessionIdentity, TokenVerifier};
