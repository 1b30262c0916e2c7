/**
 * Session Tokens
 *
 * This module verifies the JWT presented when a connection is opened and
 * turns it into a `SessionIdentity`. Tokens are issued by the account
 * subsystem; `create_token` exists for that subsystem and for tests.
 */

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::shared::messaging::UserRole;

/// Default token lifetime (30 days)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Username
    pub username: String,
    /// Role, regular when absent
    #[serde(default)]
    pub role: UserRole,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Who a connection belongs to, once authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

/// HS256 token signer and verifier
///
/// Holds the secret so nothing reads it from the environment at call time.
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    /// Create a JWT token for a user
    ///
    /// # Arguments
    /// * `user_id` - User ID (UUID)
    /// * `username` - Display name carried in the claims
    /// * `role` - User role
    ///
    /// # Returns
    /// JWT token string
    pub fn create_token(
        &self,
        user_id: Uuid,
        username: &str,
        role: UserRole,
    ) -> Result<String, BackendError> {
        let now = unix_now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role,
            exp: now + self.ttl_secs,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            tracing::error!("[Auth] Failed to sign token: {:?}", e);
            BackendError::infrastructure("Failed to create token")
        })
    }

    /// Verify and decode a JWT token
    ///
    /// # Arguments
    /// * `token` - JWT token string
    ///
    /// # Returns
    /// The identity carried by the token, or `BackendError::Authentication`
    pub fn verify(&self, token: &str) -> Result<SessionIdentity, BackendError> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| {
                tracing::debug!("[Auth] Token rejected: {:?}", e);
                BackendError::authentication(format!("Invalid token: {}", e))
            })?;

        let claims = token_data.claims;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| BackendError::authentication("Invalid user ID in token"))?;

        Ok(SessionIdentity {
            user_id,
            username: claims.username,
            role: claims.role,
        })
    }

    #[cfg(test)]
    fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
