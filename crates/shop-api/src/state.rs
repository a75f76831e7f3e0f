//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the store, payment gateways, and configuration.

use anyhow::Context;
use shop_core::{BoxedPaymentGateway, GatewaySelector};
use shop_db::Store;
use shop_paymob::PaymobGateway;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// PostgreSQL connection string
    pub database_url: String,
    /// Secret for signing access tokens
    pub access_token_secret: String,
    /// Secret for signing refresh tokens
    pub refresh_token_secret: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            access_token_secret: std::env::var("ACCESS_TOKEN_SECRET")
                .context("ACCESS_TOKEN_SECRET not set")?,
            refresh_token_secret: std::env::var("REFRESH_TOKEN_SECRET")
                .context("REFRESH_TOKEN_SECRET not set")?,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("Invalid HOST/PORT")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Persistence facade
    pub store: Store,
    /// Payment gateway selector
    pub gateways: GatewaySelector,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the default Paymob gateway
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store = Store::connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;

        let paymob = PaymobGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Paymob: {}", e))?;

        let gateways =
            GatewaySelector::new("paymob").with_gateway(Arc::new(paymob) as BoxedPaymentGateway);

        Ok(Self {
            store,
            gateways,
            config,
        })
    }

    /// Build state around existing components (tests)
    pub fn with_parts(store: Store, gateways: GatewaySelector, config: AppConfig) -> Self {
        Self {
            store,
            gateways,
            config,
        }
    }

    /// Get the default payment gateway
    pub fn default_gateway(&self) -> Option<&BoxedPaymentGateway> {
        self.gateways.default_gateway()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "postgres://localhost/shopfront".to_string(),
            access_token_secret: "access-secret".to_string(),
            refresh_token_secret: "refresh-secret".to_string(),
            environment: "test".to_string(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_is_production() {
        let mut config = test_config();
        assert!(!config.is_production());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }
}
