use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::validation::ValidationReport;
use crate::webhook_models::{WebhookResponse, WebhookStatus};

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Inbound payload failed validation. Terminal for the request.
    InvalidPayload(ValidationReport),
    /// Missing or invalid webhook signature.
    Unauthorized(String),
    /// Idempotency store could not be read or written.
    Store(String),
    /// Internal server error.
    Internal(String),
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidPayload(report) => write!(f, "Invalid payload: {}", report),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Store(msg) => write!(f, "Idempotency store error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Validation failures answer with the webhook status body the sender
    /// expects; everything else uses a generic `{"error": ...}` body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidPayload(report) => {
                tracing::warn!("Invalid WooCommerce webhook payload: {}", report);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(WebhookResponse::from(WebhookStatus::InvalidPayload)),
                )
                    .into_response();
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized webhook: {}", msg);
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            AppError::Store(msg) => {
                tracing::error!("Idempotency store error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Store(err.to_string())
    }
}

/// Failure to deliver a record to the marketing API.
///
/// Never surfaced to the webhook sender: the handler logs it and still answers 200.
///
/// Carries enough of the last attempt for diagnostics: which endpoint was
/// called, the HTTP status (absent on transport failures) and the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingError {
    pub endpoint: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub attempts: u32,
    pub message: String,
}

impl fmt::Display for ForwardingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} returned {} after {} attempt(s): {}",
                self.endpoint, status, self.attempts, self.message
            ),
            None => write!(
                f,
                "{} unreachable after {} attempt(s): {}",
                self.endpoint, self.attempts, self.message
            ),
        }
    }
}

impl std::error::Error for ForwardingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_payload_maps_to_400() {
        let mut report = ValidationReport::default();
        report.add("id", "The id field is required.");
        let response = AppError::InvalidPayload(report).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let response = AppError::Unauthorized("bad signature".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_store_error_maps_to_500() {
        let response = AppError::Store("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_forwarding_error_display() {
        let err = ForwardingError {
            endpoint: "/events/".to_string(),
            status: Some(500),
            body: Some("boom".to_string()),
            attempts: 3,
            message: "Klaviyo API error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "/events/ returned 500 after 3 attempt(s): Klaviyo API error"
        );

        let transport = ForwardingError {
            status: None,
            body: None,
            message: "connection refused".to_string(),
            ..err
        };
        assert!(transport.to_string().contains("unreachable"));
    }
}
