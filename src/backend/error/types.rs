/**
 * Backend Error Types
 *
 * This module defines error types specific to the backend server.
 * The same error value is returned from HTTP handlers, from session
 * protocol handlers, and from background jobs.
 *
 * # Error Categories
 *
 * ## Caller Errors
 *
 * Raised because of who the caller is or what they sent:
 * - `Authentication` - missing, malformed or expired token
 * - `AccessDenied` - caller is not a participant of the conversation
 * - `NotFound` - a referenced user or record does not exist
 * - `Validation` - payload rejected before any side effect
 *
 * ## Infrastructure Errors
 *
 * Raised when a collaborator fails: the document store, the presence
 * store, or the work queue. Database and Redis errors convert into
 * `Infrastructure` automatically so handlers can use `?`.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::SharedError;

/// Backend-specific error types
///
/// Each variant maps to an HTTP status code and to a stable wire code
/// used in `{ "success": false, "error": ..., "code": ... }` acknowledgements.
///
/// # Usage
///
/// ```rust
/// use pulsechat::backend::error::BackendError;
///
/// let err = BackendError::access_denied("Conversation not found or access denied");
/// assert_eq!(err.code(), "access_denied");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// The handshake token was missing, malformed, badly signed or expired
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message
        message: String,
    },

    /// The caller may not act on the referenced resource
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Human-readable error message
        message: String,
    },

    /// A referenced record does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message
        message: String,
    },

    /// The request payload was rejected
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message
        message: String,
    },

    /// A backing service failed
    ///
    /// The message is safe to send to clients; details are logged where
    /// the error is raised.
    #[error("Infrastructure error: {message}")]
    Infrastructure {
        /// Human-readable error message
        message: String,
    },

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new access denied error
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Create a new not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new infrastructure error
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
        }
    }

    /// Stable wire code for this error
    ///
    /// # Returns
    ///
    /// One of `auth`, `access_denied`, `not_found`, `validation`,
    /// `infrastructure`
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "auth",
            Self::AccessDenied { .. } => "access_denied",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::Infrastructure { .. } => "infrastructure",
            Self::SharedError(_) => "validation",
            Self::SerializationError(_) => "infrastructure",
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Authentication` - 401 Unauthorized
    /// - `AccessDenied` - 403 Forbidden
    /// - `NotFound` - 404 Not Found
    /// - `Validation` and `SharedError` - 400 Bad Request
    /// - `Infrastructure` and `SerializationError` - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::AccessDenied { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Infrastructure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SharedError(_) => StatusCode::BAD_REQUEST,
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// Validation failures from the shared module report only their
    /// message so clients see e.g. "At least one participant required".
    pub fn message(&self) -> String {
        match self {
            Self::Authentication { message }
            | Self::AccessDenied { message }
            | Self::NotFound { message }
            | Self::Validation { message }
            | Self::Infrastructure { message } => message.clone(),
            Self::SharedError(SharedError::ValidationError { message, .. }) => message.clone(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("[Store] Database error: {:?}", err);
        Self::infrastructure("Database operation failed")
    }
}

impl From<redis::RedisError> for BackendError {
    fn from(err: redis::RedisError) -> Self {
        tracing::error!("[Presence] Redis error: {:?}", err);
        Self::infrastructure("Presence store operation failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_codes_and_status() {
        let cases = [
            (BackendError::authentication("x"), "auth", StatusCode::UNAUTHORIZED),
            (BackendError::access_denied("x"), "access_denied", StatusCode::FORBIDDEN),
            (BackendError::not_found("x"), "not_found", StatusCode::NOT_FOUND),
            (BackendError::validation("x"), "validation", StatusCode::BAD_REQUEST),
            (
                BackendError::infrastructure("x"),
                "infrastructure",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn test_from_shared_validation_error() {
        let err: BackendError =
            SharedError::validation("participant_ids", "At least one participant required").into();
        assert_matches!(err, BackendError::SharedError(_));
        assert_eq!(err.code(), "validation");
        assert_eq!(err.message(), "At least one participant required");
    }

    #[test]
    fn test_from_sqlx_error_is_infrastructure() {
        let err: BackendError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.code(), "infrastructure");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
