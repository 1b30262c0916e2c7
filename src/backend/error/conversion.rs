/**
 * Error Conversion
 *
 * Backend errors leave the server in two shapes:
 *
 * HTTP responses, via `IntoResponse`:
 * ```json
 * { "error": "Error message", "status": 403 }
 * ```
 *
 * Session acknowledgements, via `BackendError::to_ack`:
 * ```json
 * { "success": false, "error": "Error message", "code": "access_denied" }
 * ```
 */

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::backend::error::types::BackendError;

impl BackendError {
    /// Structured failure payload for a session acknowledgement
    pub fn to_ack(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.message(),
            "code": self.code(),
        })
    }
}

impl IntoResponse for BackendError {
    /// Convert a backend error into a JSON HTTP response
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| {
                let mut response = Response::new(Body::from("Internal Server Error"));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_payload() {
        let ack = BackendError::not_found("One or more users not found").to_ack();
        assert_eq!(ack["success"], false);
        assert_eq!(ack["error"], "One or more users not found");
        assert_eq!(ack["code"], "not_found");
    }

    #[test]
    fn test_into_response_status() {
        let response = BackendError::access_denied("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get("Content-Type").map(|v| v.as_bytes()),
            Some(&b"application/json"[..])
        );
    }
}
