//! # Paymob Configuration
//!
//! Configuration management for the Paymob Accept integration.
//! All secrets are loaded from environment variables.

use shop_core::StoreError;
use std::env;

/// Default Accept API base URL
pub const DEFAULT_BASE_URL: &str = "https://accept.paymob.com/api";

/// Paymob Accept API configuration
#[derive(Debug, Clone)]
pub struct PaymobConfig {
    /// Merchant API key (used to obtain auth tokens)
    pub api_key: String,

    /// HMAC secret for webhook signature verification
    pub hmac_secret: String,

    /// Mobile-wallet integration ID
    pub integration_id: i64,

    /// API base URL (for testing/mocking)
    pub base_url: String,

    /// Storefront base URL; the wallet payment page lives under it
    pub client_url: String,
}

impl PaymobConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYMOB_API_KEY`
    /// - `PAYMOB_HMAC_SECRET`
    /// - `PAYMOB_INTEGRATION_ID`
    ///
    /// Optional:
    /// - `PAYMOB_BASE_URL` (defaults to the production Accept API)
    /// - `CLIENT_URL` (defaults to `http://localhost:8080`)
    pub fn from_env() -> Result<Self, StoreError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_key = env::var("PAYMOB_API_KEY")
            .map_err(|_| StoreError::Configuration("PAYMOB_API_KEY not set".to_string()))?;

        let hmac_secret = env::var("PAYMOB_HMAC_SECRET")
            .map_err(|_| StoreError::Configuration("PAYMOB_HMAC_SECRET not set".to_string()))?;

        let integration_id = env::var("PAYMOB_INTEGRATION_ID")
            .map_err(|_| StoreError::Configuration("PAYMOB_INTEGRATION_ID not set".to_string()))?
            .parse()
            .map_err(|_| {
                StoreError::Configuration("PAYMOB_INTEGRATION_ID must be numeric".to_string())
            })?;

        let base_url =
            env::var("PAYMOB_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let client_url =
            env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        Ok(Self {
            api_key,
            hmac_secret,
            integration_id,
            base_url,
            client_url,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        api_key: impl Into<String>,
        hmac_secret: impl Into<String>,
        integration_id: i64,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            hmac_secret: hmac_secret.into(),
            integration_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            client_url: "http://localhost:8080".to_string(),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder: set the storefront client URL
    pub fn with_client_url(mut self, url: impl Into<String>) -> Self {
        self.client_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config() {
        let config = PaymobConfig::new("pm_key", "pm_hmac", 5211141)
            .with_base_url("http://localhost:9999/api")
            .with_client_url("https://shop.example.com");

        assert_eq!(config.integration_id, 5211141);
        assert_eq!(config.base_url, "http://localhost:9999/api");
        assert_eq!(config.client_url, "https://shop.example.com");
    }

    #[test]
    fn test_from_env_missing_key() {
        env::remove_var("PAYMOB_API_KEY");

        let result = PaymobConfig::from_env();
        assert!(result.is_err());
    }
}
