//! # Request Handlers
//!
//! Axum request handlers for the storefront API, grouped by concern:
//! account management, catalog, cart, and orders/payment.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use shop_core::StoreError;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Map a domain error onto its HTTP response
pub fn store_error_to_response(err: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "shopfront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert!(err.details.is_none());

        let err = err.with_details("field: quantity");
        assert_eq!(err.details.as_deref(), Some("field: quantity"));
    }

    #[test]
    fn test_store_error_conversion() {
        let (status, _json) =
            store_error_to_response(StoreError::InvalidRequest("bad data".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _json) = store_error_to_response(StoreError::PaymentDeclined {
            reason: "wallet rejected".to_string(),
        });
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    }
}
