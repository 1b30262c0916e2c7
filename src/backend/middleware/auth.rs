/**
 * Authentication Extractor
 *
 * Protects HTTP routes that require an authenticated user. The JWT is
 * taken from the `Authorization: Bearer <token>` header and verified with
 * the server's `TokenVerifier`; handlers receive the resulting identity.
 */

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::backend::auth::{bearer_token, SessionIdentity};
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Axum extractor for the authenticated caller
///
/// Rejects with 401 when the header is missing, malformed, or carries an
/// invalid token.
#[derive(Clone, Debug)]
pub struct AuthUser(pub SessionIdentity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("[Auth] Missing Authorization header");
                BackendError::authentication("Missing Authorization header")
            })?;

        let token = bearer_token(header).ok_or_else(|| {
            tracing::warn!("[Auth] Invalid Authorization header format");
            BackendError::authentication("Invalid Authorization header format")
        })?;

        let identity = state.tokens.verify(token).map_err(|err| {
            tracing::warn!("[Auth] Invalid token: {}", err);
            err
        })?;
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::server::config::ServerConfig;
    use crate::shared::messaging::UserRole;
    use axum::http::Request;
    use uuid::Uuid;

    async fn extract(state: &AppState, header: Option<String>) -> Result<AuthUser, BackendError> {
        let mut builder = Request::builder().uri("/api/presence/online");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn test_valid_bearer_token() {
        let state = AppState::in_memory(ServerConfig::default());
        let user_id = Uuid::new_v4();
        let token = state.tokens.create_token(user_id, "alice", UserRole::Admin).unwrap();

        let AuthUser(identity) = extract(&state, Some(format!("Bearer {}", token))).await.unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_rejections_are_unauthorized() {
        let state = AppState::in_memory(ServerConfig::default());
        for header in [None, Some("Token abc".to_string()), Some("Bearer abc".to_string())] {
            let err = extract(&state, header).await.unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        }
    }
}
