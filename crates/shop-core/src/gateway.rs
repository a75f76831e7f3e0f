//! # Payment Gateway Trait
//!
//! Seam between the storefront and payment providers. The checkout handler
//! only sees this trait; the Paymob implementation lives in `shop-paymob`.

use crate::error::StoreResult;
use crate::money::Currency;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Order summary handed to the gateway when starting a payment
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOrder {
    /// Our internal order ID (for logging and metadata)
    pub order_id: String,
    /// Total in smallest currency unit
    pub amount_cents: i64,
    /// Order currency
    pub currency: Currency,
    /// Line summaries forwarded to the provider
    pub lines: Vec<CheckoutLine>,
}

/// A single line forwarded to the provider
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutLine {
    pub name: String,
    pub description: String,
    pub amount_cents: i64,
    pub quantity: i64,
}

/// Customer details for the provider's billing data
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Result of the provider-side payment setup
/// (auth token -> remote order -> payment key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's order ID (used to match the webhook callback)
    pub gateway_order_id: String,
    /// Payment key/token the client charges against
    pub payment_token: String,
    /// URL the client is redirected to for payment entry
    pub payment_url: String,
}

/// Result of a direct mobile-wallet charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletCharge {
    /// Provider's transaction ID
    pub transaction_id: String,
    /// Whether the charge is still pending wallet-side approval
    pub pending: bool,
    /// Redirect URL for wallet-side confirmation, when the provider
    /// returns one
    pub redirect_url: Option<String>,
}

/// A verified, parsed transaction callback from the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCallback {
    /// Whether the charge succeeded
    pub success: bool,
    /// Provider's order ID
    pub gateway_order_id: String,
    /// Provider's transaction ID (if present)
    pub transaction_id: Option<String>,
    /// Amount charged, smallest unit
    pub amount_cents: Option<i64>,
    /// Currency of the charge
    pub currency: Option<Currency>,
    /// Payment source subtype (e.g. "WALLET")
    pub source_subtype: Option<String>,
}

/// Core trait for payment provider implementations.
///
/// Each provider implements the full sequential payment setup behind
/// `create_payment`, so handlers never see provider-specific steps.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Run the provider's payment setup flow for an order and return the
    /// payment token plus the provider-side order ID.
    async fn create_payment(
        &self,
        order: &CheckoutOrder,
        customer: &Customer,
    ) -> StoreResult<PaymentIntent>;

    /// Charge a mobile wallet directly against a previously issued
    /// payment token.
    async fn wallet_charge(
        &self,
        payment_token: &str,
        wallet_number: &str,
    ) -> StoreResult<WalletCharge>;

    /// Verify a webhook signature and parse the transaction callback.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `hmac` - Hex digest from the provider's `hmac` query parameter
    fn verify_callback(&self, payload: &[u8], hmac: &str) -> StoreResult<TransactionCallback>;

    /// Parse a callback without signature verification (the provider may
    /// omit the `hmac` parameter on some integration types).
    fn parse_callback(&self, payload: &[u8]) -> StoreResult<TransactionCallback>;

    /// Provider name (for logging and routing)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Gateway selector for multiple providers
#[derive(Clone)]
pub struct GatewaySelector {
    gateways: std::collections::HashMap<String, BoxedPaymentGateway>,
    default_provider: String,
}

impl GatewaySelector {
    /// Create a new selector with a default provider
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            gateways: std::collections::HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a gateway
    pub fn register(&mut self, gateway: BoxedPaymentGateway) {
        let name = gateway.provider_name().to_string();
        self.gateways.insert(name, gateway);
    }

    /// Register with builder pattern
    pub fn with_gateway(mut self, gateway: BoxedPaymentGateway) -> Self {
        self.register(gateway);
        self
    }

    /// Get the default gateway
    pub fn default_gateway(&self) -> Option<&BoxedPaymentGateway> {
        self.gateways.get(&self.default_provider)
    }

    /// Get a gateway by provider name
    pub fn get(&self, provider: &str) -> Option<&BoxedPaymentGateway> {
        self.gateways.get(provider)
    }

    /// Get gateway or fall back to default
    pub fn get_or_default(&self, provider: Option<&str>) -> Option<&BoxedPaymentGateway> {
        match provider {
            Some(p) => self.get(p).or_else(|| self.default_gateway()),
            None => self.default_gateway(),
        }
    }

    /// List all registered providers
    pub fn providers(&self) -> Vec<&str> {
        self.gateways.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for GatewaySelector {
    fn default() -> Self {
        Self::new("paymob")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selector() {
        let selector = GatewaySelector::new("paymob");
        assert!(selector.default_gateway().is_none());
        assert!(selector.get_or_default(Some("paymob")).is_none());
        assert_eq!(selector.providers().len(), 0);
    }
}
