//! # Storefront Error Types
//!
//! Typed error handling for the shopfront storefront.
//! All fallible operations return `Result<T, StoreError>`.

use thiserror::Error;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Login/registration credential failures
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing or invalid access token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Not enough stock to cover the requested quantity
    #[error("Insufficient stock for {product_name}: {available} available")]
    InsufficientStock {
        product_name: String,
        available: i64,
    },

    /// Order not found (or not owned by the requester)
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Uniqueness conflict (duplicate username/email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Illegal order status transition
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Network/HTTP error communicating with the provider
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Payment was declined by the provider
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_) | StoreError::Provider { .. } | StoreError::Database(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Configuration(_) => 500,
            StoreError::InvalidRequest(_) => 400,
            StoreError::InvalidCredentials => 401,
            StoreError::Unauthorized(_) => 401,
            StoreError::ProductNotFound { .. } => 404,
            StoreError::InsufficientStock { .. } => 400,
            StoreError::OrderNotFound { .. } => 404,
            StoreError::Conflict(_) => 409,
            StoreError::InvalidTransition { .. } => 409,
            StoreError::Provider { .. } => 502,
            StoreError::Network(_) => 503,
            StoreError::WebhookVerificationFailed(_) => 400,
            StoreError::WebhookParseError(_) => 400,
            StoreError::PaymentDeclined { .. } => 402,
            StoreError::Database(_) => 500,
            StoreError::Serialization(_) => 500,
            StoreError::Internal(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::Network("timeout".into()).is_retryable());
        assert!(StoreError::Provider {
            provider: "paymob".into(),
            message: "upstream 500".into()
        }
        .is_retryable());
        assert!(!StoreError::InvalidRequest("bad data".into()).is_retryable());
        assert!(!StoreError::InvalidCredentials.is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StoreError::InvalidRequest("test".into()).status_code(), 400);
        assert_eq!(
            StoreError::ProductNotFound {
                product_id: "x".into()
            }
            .status_code(),
            404
        );
        assert_eq!(StoreError::InvalidCredentials.status_code(), 401);
        assert_eq!(
            StoreError::InsufficientStock {
                product_name: "Widget".into(),
                available: 2
            }
            .status_code(),
            400
        );
        assert_eq!(
            StoreError::PaymentDeclined {
                reason: "wallet rejected".into()
            }
            .status_code(),
            402
        );
        assert_eq!(StoreError::Conflict("email taken".into()).status_code(), 409);
    }
}
