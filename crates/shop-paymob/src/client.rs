//! # Paymob Accept Client
//!
//! Implementation of the Accept API mobile-wallet flow. Payment setup is
//! four sequential calls:
//!
//! 1. `POST /auth/tokens` — exchange the merchant API key for an auth token
//! 2. `POST /ecommerce/orders` — register the order with the provider
//! 3. `POST /acceptance/payment_keys` — obtain a payment key for the order
//! 4. `POST /acceptance/payments/pay` — charge the customer's wallet
//!
//! Steps 1-3 run inside [`PaymobGateway::create_payment`]; step 4 is the
//! separate [`PaymobGateway::wallet_charge`] invoked once the customer has
//! supplied a wallet number.

use crate::config::PaymobConfig;
use crate::webhook;
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shop_core::{
    CheckoutOrder, Customer, PaymentGateway, PaymentIntent, StoreError, StoreResult,
    TransactionCallback, WalletCharge,
};
use tracing::{debug, error, info, instrument};

/// Payment key lifetime in seconds
const PAYMENT_KEY_EXPIRATION: i64 = 3600;

/// Paymob Accept gateway
pub struct PaymobGateway {
    config: PaymobConfig,
    client: Client,
}

impl PaymobGateway {
    /// Create a new gateway from explicit config
    pub fn new(config: PaymobConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        let config = PaymobConfig::from_env()?;
        Self::new(config)
    }

    /// Step 1: exchange the API key for a short-lived auth token
    #[instrument(skip(self))]
    async fn auth_token(&self) -> StoreResult<String> {
        let response: AuthResponse = self
            .post_json(
                "/auth/tokens",
                &AuthRequest {
                    api_key: &self.config.api_key,
                },
            )
            .await?;
        debug!("Obtained Paymob auth token");
        Ok(response.token)
    }

    /// Step 2: register the order with Paymob
    #[instrument(skip(self, auth_token, order), fields(order_id = %order.order_id))]
    async fn register_order(&self, auth_token: &str, order: &CheckoutOrder) -> StoreResult<i64> {
        let items = order
            .lines
            .iter()
            .map(|line| RegisterOrderItem {
                name: line.name.clone(),
                amount_cents: line.amount_cents,
                description: line.description.clone(),
                quantity: line.quantity,
            })
            .collect();

        let response: RegisterOrderResponse = self
            .post_json(
                "/ecommerce/orders",
                &RegisterOrderRequest {
                    auth_token,
                    delivery_needed: false,
                    amount_cents: order.amount_cents,
                    currency: order.currency.as_str(),
                    items,
                },
            )
            .await?;

        info!("Registered Paymob order: {}", response.id);
        Ok(response.id)
    }

    /// Step 3: obtain a payment key for the registered order
    #[instrument(skip(self, auth_token, order, customer), fields(gateway_order_id))]
    async fn payment_key(
        &self,
        auth_token: &str,
        gateway_order_id: i64,
        order: &CheckoutOrder,
        customer: &Customer,
    ) -> StoreResult<String> {
        let response: PaymentKeyResponse = self
            .post_json(
                "/acceptance/payment_keys",
                &PaymentKeyRequest {
                    auth_token,
                    amount_cents: order.amount_cents,
                    expiration: PAYMENT_KEY_EXPIRATION,
                    order_id: gateway_order_id,
                    billing_data: BillingData::from_customer(customer),
                    currency: order.currency.as_str(),
                    integration_id: self.config.integration_id,
                },
            )
            .await?;

        debug!("Obtained mobile-wallet payment key");
        Ok(response.token)
    }

    /// Build the hosted wallet-payment page URL for a payment key
    fn payment_url(&self, payment_token: &str, order: &CheckoutOrder) -> String {
        format!(
            "{}/mobile-wallet-payment?token={}&amount={:.2}",
            self.config.client_url,
            payment_token,
            order.currency.from_smallest_unit(order.amount_cents)
        )
    }

    /// POST a JSON body and parse the JSON response, surfacing provider
    /// errors with their body text
    async fn post_json<B, R>(&self, path: &str, body: &B) -> StoreResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Paymob API error: path={}, status={}, body={}", path, status, text);
            return Err(StoreError::Provider {
                provider: "paymob".to_string(),
                message: format!("HTTP {status}: {text}"),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse Paymob response: {e}"))
        })
    }
}

#[async_trait]
impl PaymentGateway for PaymobGateway {
    #[instrument(skip(self, order, customer), fields(order_id = %order.order_id))]
    async fn create_payment(
        &self,
        order: &CheckoutOrder,
        customer: &Customer,
    ) -> StoreResult<PaymentIntent> {
        if order.lines.is_empty() {
            return Err(StoreError::InvalidRequest("Order has no items".to_string()));
        }
        if order.amount_cents <= 0 {
            return Err(StoreError::InvalidRequest(
                "Order amount must be positive".to_string(),
            ));
        }

        let auth_token = self.auth_token().await?;
        let gateway_order_id = self.register_order(&auth_token, order).await?;
        let payment_token = self
            .payment_key(&auth_token, gateway_order_id, order, customer)
            .await?;

        info!(
            "Payment setup complete: order={}, gateway_order={}",
            order.order_id, gateway_order_id
        );

        Ok(PaymentIntent {
            gateway_order_id: gateway_order_id.to_string(),
            payment_url: self.payment_url(&payment_token, order),
            payment_token,
        })
    }

    #[instrument(skip(self, payment_token, wallet_number))]
    async fn wallet_charge(
        &self,
        payment_token: &str,
        wallet_number: &str,
    ) -> StoreResult<WalletCharge> {
        let response: WalletPayResponse = self
            .post_json(
                "/acceptance/payments/pay",
                &WalletPayRequest {
                    source: WalletSource {
                        identifier: wallet_number,
                        subtype: "WALLET",
                    },
                    payment_token,
                },
            )
            .await?;

        if let Some(false) = response.success {
            return Err(StoreError::PaymentDeclined {
                reason: response
                    .data
                    .and_then(|d| d.message)
                    .unwrap_or_else(|| "wallet charge rejected".to_string()),
            });
        }

        info!(
            "Wallet charge initiated: txn={}, pending={}",
            response.id, response.pending
        );

        Ok(WalletCharge {
            transaction_id: response.id.to_string(),
            pending: response.pending,
            redirect_url: response
                .redirect_url
                .or(response.iframe_redirection_url),
        })
    }

    fn verify_callback(&self, payload: &[u8], hmac: &str) -> StoreResult<TransactionCallback> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| StoreError::WebhookParseError(format!("Invalid JSON: {e}")))?;

        if !webhook::verify_signature(&self.config.hmac_secret, &value, hmac) {
            return Err(StoreError::WebhookVerificationFailed(
                "Signature mismatch".to_string(),
            ));
        }

        webhook::parse_callback(&value)
    }

    fn parse_callback(&self, payload: &[u8]) -> StoreResult<TransactionCallback> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| StoreError::WebhookParseError(format!("Invalid JSON: {e}")))?;
        webhook::parse_callback(&value)
    }

    fn provider_name(&self) -> &'static str {
        "paymob"
    }
}

// =============================================================================
// Accept API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct RegisterOrderRequest<'a> {
    auth_token: &'a str,
    delivery_needed: bool,
    amount_cents: i64,
    currency: &'a str,
    items: Vec<RegisterOrderItem>,
}

#[derive(Debug, Serialize)]
struct RegisterOrderItem {
    name: String,
    amount_cents: i64,
    description: String,
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct RegisterOrderResponse {
    id: i64,
}

#[derive(Debug, Serialize)]
struct PaymentKeyRequest<'a> {
    auth_token: &'a str,
    amount_cents: i64,
    expiration: i64,
    order_id: i64,
    billing_data: BillingData<'a>,
    currency: &'a str,
    integration_id: i64,
}

/// Accept requires the full billing block; fields the storefront does not
/// collect are sent as "NA"
#[derive(Debug, Serialize)]
struct BillingData<'a> {
    apartment: &'static str,
    email: &'a str,
    floor: &'static str,
    first_name: &'a str,
    street: &'static str,
    building: &'static str,
    phone_number: &'a str,
    shipping_method: &'static str,
    postal_code: &'static str,
    city: &'static str,
    country: &'static str,
    last_name: &'a str,
    state: &'static str,
}

impl<'a> BillingData<'a> {
    fn from_customer(customer: &'a Customer) -> Self {
        Self {
            apartment: "NA",
            email: &customer.email,
            floor: "NA",
            first_name: &customer.first_name,
            street: "NA",
            building: "NA",
            phone_number: &customer.phone,
            shipping_method: "NA",
            postal_code: "NA",
            city: "NA",
            country: "EG",
            last_name: &customer.last_name,
            state: "NA",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentKeyResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct WalletPayRequest<'a> {
    source: WalletSource<'a>,
    payment_token: &'a str,
}

#[derive(Debug, Serialize)]
struct WalletSource<'a> {
    identifier: &'a str,
    subtype: &'static str,
}

#[derive(Debug, Deserialize)]
struct WalletPayResponse {
    id: i64,
    #[serde(default)]
    pending: bool,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    iframe_redirection_url: Option<String>,
    #[serde(default)]
    data: Option<WalletPayData>,
}

#[derive(Debug, Deserialize)]
struct WalletPayData {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::{CheckoutLine, Currency};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_gateway(base_url: &str) -> PaymobGateway {
        let config = PaymobConfig::new("pm_key", "pm_hmac", 5211141)
            .with_base_url(base_url.to_string())
            .with_client_url("http://localhost:8080");
        PaymobGateway::new(config).unwrap()
    }

    fn test_order() -> CheckoutOrder {
        CheckoutOrder {
            order_id: "ord-1".to_string(),
            amount_cents: 15000,
            currency: Currency::EGP,
            lines: vec![CheckoutLine {
                name: "Widget".to_string(),
                description: "A widget".to_string(),
                amount_cents: 7500,
                quantity: 2,
            }],
        }
    }

    fn test_customer() -> Customer {
        Customer {
            email: "buyer@example.com".to_string(),
            first_name: "Mona".to_string(),
            last_name: "Ali".to_string(),
            phone: "+201000000000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_payment_flow() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/tokens"))
            .and(body_partial_json(serde_json::json!({ "api_key": "pm_key" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "token": "auth-tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/ecommerce/orders"))
            .and(body_partial_json(serde_json::json!({
                "auth_token": "auth-tok",
                "delivery_needed": false,
                "amount_cents": 15000,
                "currency": "EGP"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 987654 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/acceptance/payment_keys"))
            .and(body_partial_json(serde_json::json!({
                "order_id": 987654,
                "integration_id": 5211141,
                "expiration": 3600,
                "billing_data": { "country": "EG", "email": "buyer@example.com" }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({ "token": "pay-key" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = test_gateway(&server.uri());
        let intent = gateway
            .create_payment(&test_order(), &test_customer())
            .await
            .unwrap();

        assert_eq!(intent.gateway_order_id, "987654");
        assert_eq!(intent.payment_token, "pay-key");
        assert_eq!(
            intent.payment_url,
            "http://localhost:8080/mobile-wallet-payment?token=pay-key&amount=150.00"
        );
    }

    #[tokio::test]
    async fn test_create_payment_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": "Incorrect credentials"
            })))
            .mount(&server)
            .await;

        let gateway = test_gateway(&server.uri());
        let err = gateway
            .create_payment(&test_order(), &test_customer())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Provider { .. }));
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_create_payment_rejects_empty_order() {
        let server = MockServer::start().await;
        let gateway = test_gateway(&server.uri());

        let mut order = test_order();
        order.lines.clear();

        let err = gateway
            .create_payment(&order, &test_customer())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_wallet_charge() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/acceptance/payments/pay"))
            .and(body_partial_json(serde_json::json!({
                "source": { "identifier": "01012345678", "subtype": "WALLET" },
                "payment_token": "pay-key"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 4471234,
                "pending": true,
                "redirect_url": "https://wallet.example.com/confirm"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = test_gateway(&server.uri());
        let charge = gateway.wallet_charge("pay-key", "01012345678").await.unwrap();

        assert_eq!(charge.transaction_id, "4471234");
        assert!(charge.pending);
        assert_eq!(
            charge.redirect_url.as_deref(),
            Some("https://wallet.example.com/confirm")
        );
    }

    #[tokio::test]
    async fn test_wallet_charge_declined() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/acceptance/payments/pay"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 4471235,
                "success": false,
                "data": { "message": "insufficient wallet balance" }
            })))
            .mount(&server)
            .await;

        let gateway = test_gateway(&server.uri());
        let err = gateway
            .wallet_charge("pay-key", "01012345678")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::PaymentDeclined { .. }));
        assert_eq!(err.status_code(), 402);
    }

    #[test]
    fn test_verify_callback_signature() {
        let config = PaymobConfig::new("pm_key", "pm_hmac", 5211141);
        let gateway = PaymobGateway::new(config).unwrap();

        let payload = serde_json::json!({
            "success": true,
            "id": 4471234,
            "order": { "id": 987654 },
            "amount_cents": 15000,
            "currency": "EGP"
        });
        let body = serde_json::to_vec(&payload).unwrap();
        let sig = crate::webhook::compute_signature("pm_hmac", &payload);

        let cb = gateway.verify_callback(&body, &sig).unwrap();
        assert!(cb.success);
        assert_eq!(cb.gateway_order_id, "987654");

        let err = gateway.verify_callback(&body, "deadbeef").unwrap_err();
        assert!(matches!(err, StoreError::WebhookVerificationFailed(_)));
    }
}
