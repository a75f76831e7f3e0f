//! Order and payment handlers: checkout orchestration, client-driven
//! completion, direct wallet charge, order history, and the provider
//! webhook.

use crate::auth::AuthUser;
use crate::handlers::{store_error_to_response, ErrorResponse};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{CheckoutLine, CheckoutOrder, Customer, Money, OrderStatus, StoreError};
use shop_db::{HistoryItem, Order, StockPolicy};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Checkout response: the created order plus what the client needs to
/// start the payment
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub total_cents: i64,
    pub currency: String,
    pub payment_token: String,
    pub payment_url: String,
}

#[derive(Debug, Deserialize)]
pub struct WalletPayRequest {
    pub payment_key: String,
    pub wallet_number: String,
}

#[derive(Debug, Serialize)]
pub struct WalletPayResponse {
    pub transaction_id: String,
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// One order in the history listing
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<HistoryItem>,
}

/// Egyptian mobile wallet numbers: `01` followed by nine digits
fn is_valid_wallet_number(number: &str) -> bool {
    number.len() == 11 && number.starts_with("01") && number.bytes().all(|b| b.is_ascii_digit())
}

/// A buyer may only complete an order that is still awaiting payment.
/// Recovery edges such as `payment_failed -> completed` are reserved for
/// the provider callback; accepting them here would fulfill an unpaid
/// order.
fn ensure_client_completable(status: OrderStatus) -> Result<(), StoreError> {
    if status == OrderStatus::Pending {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            from: status.as_str().to_string(),
            to: OrderStatus::Completed.as_str().to_string(),
        })
    }
}

fn customer_from(user: &shop_db::User) -> Customer {
    // Paymob billing data tolerates "NA" for fields we do not collect
    let mut parts = user.username.splitn(2, ' ');
    let first_name = parts.next().unwrap_or("NA").to_string();
    let last_name = parts.next().unwrap_or("NA").to_string();
    Customer {
        email: user.email.clone(),
        first_name,
        last_name,
        phone: user.phone.clone().unwrap_or_else(|| "NA".to_string()),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an order from the cart and run the gateway's payment setup.
///
/// The order row is created first; if the gateway then fails, the order
/// is kept and marked `payment_failed` so the attempt is visible in the
/// history.
#[instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let gateway = state.default_gateway().ok_or_else(|| {
        store_error_to_response(StoreError::Configuration(
            "No payment gateway configured".to_string(),
        ))
    })?;

    let profile = state
        .store
        .find_user(user.user_id)
        .await
        .map_err(store_error_to_response)?;

    let placed = state
        .store
        .create_order_from_cart(user.user_id, "EGP")
        .await
        .map_err(store_error_to_response)?;

    let checkout = CheckoutOrder {
        order_id: placed.order.id.to_string(),
        amount_cents: placed.order.total_amount_cents,
        currency: placed.order.currency(),
        lines: placed
            .lines
            .iter()
            .map(|line| CheckoutLine {
                name: line.name.clone(),
                description: line.description.clone().unwrap_or_default(),
                amount_cents: line.price_cents,
                quantity: line.quantity,
            })
            .collect(),
    };
    let customer = customer_from(&profile);

    let intent = match gateway.create_payment(&checkout, &customer).await {
        Ok(intent) => intent,
        Err(e) => {
            error!("Payment setup failed for order {}: {}", placed.order.id, e);
            if let Err(mark) = state
                .store
                .set_status(placed.order.id, OrderStatus::PaymentFailed)
                .await
            {
                error!("Could not mark order {} failed: {}", placed.order.id, mark);
            }
            let code = e.status_code();
            return Err((
                StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
                Json(
                    ErrorResponse::new(e.to_string(), code)
                        .with_details(format!("order_id: {}", placed.order.id)),
                ),
            ));
        }
    };

    state
        .store
        .attach_gateway_order(placed.order.id, &intent.gateway_order_id)
        .await
        .map_err(store_error_to_response)?;

    info!(
        "Order {} ready for payment: {} (gateway order {})",
        placed.order.id,
        Money::from_cents(placed.order.total_amount_cents, placed.order.currency()).display(),
        intent.gateway_order_id
    );

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: placed.order.id,
            total_cents: placed.order.total_amount_cents,
            currency: placed.order.currency,
            payment_token: intent.payment_token,
            payment_url: intent.payment_url,
        }),
    ))
}

/// Client-driven completion for a pending order, used by the
/// payment-success return path. Stock is checked strictly here.
#[instrument(skip(state), fields(user_id = %user.user_id, order_id = %order_id))]
pub async fn complete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, (StatusCode, Json<ErrorResponse>)> {
    let order = state
        .store
        .find_order_for_user(order_id, user.user_id)
        .await
        .map_err(store_error_to_response)?;

    let status = order.status().map_err(store_error_to_response)?;
    ensure_client_completable(status).map_err(store_error_to_response)?;

    let completed = state
        .store
        .fulfill(&order, StockPolicy::Strict)
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(completed))
}

/// Order history for the authenticated user, newest first
pub async fn order_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let history = state
        .store
        .order_history(user.user_id)
        .await
        .map_err(store_error_to_response)?;

    let orders: Vec<HistoryEntry> = history
        .into_iter()
        .map(|(order, items)| HistoryEntry { order, items })
        .collect();

    Ok(Json(serde_json::json!({
        "orders": orders,
        "count": orders.len()
    })))
}

/// Charge a mobile wallet against a previously issued payment key
#[instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn wallet_pay(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<WalletPayRequest>,
) -> Result<Json<WalletPayResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !is_valid_wallet_number(&request.wallet_number) {
        return Err(store_error_to_response(StoreError::InvalidRequest(
            "Wallet number must be 01 followed by nine digits".to_string(),
        )));
    }

    let gateway = state.default_gateway().ok_or_else(|| {
        store_error_to_response(StoreError::Configuration(
            "No payment gateway configured".to_string(),
        ))
    })?;

    let charge = gateway
        .wallet_charge(&request.payment_key, &request.wallet_number)
        .await
        .map_err(store_error_to_response)?;

    info!(
        "Wallet charge {} (pending: {})",
        charge.transaction_id, charge.pending
    );

    Ok(Json(WalletPayResponse {
        transaction_id: charge.transaction_id,
        pending: charge.pending,
        redirect_url: charge.redirect_url,
    }))
}

/// Paymob transaction webhook.
///
/// Signature verification runs when the `hmac` query parameter is
/// present; an invalid signature is rejected with 400 and an unknown
/// gateway order with 404. Every other outcome responds 200 so the
/// provider does not retry: terminal orders acknowledge and skip,
/// successful charges fulfill (stock clamped at zero), fulfillment
/// failures park the order as `payment_confirmed_but_failed`, declined
/// charges mark it `payment_failed`.
#[instrument(skip(state, params, body))]
pub async fn paymob_webhook(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let gateway = state.gateways.get("paymob").ok_or_else(|| {
        store_error_to_response(StoreError::Configuration(
            "Paymob not configured".to_string(),
        ))
    })?;

    let callback = match params.get("hmac") {
        Some(hmac) => gateway.verify_callback(&body, hmac),
        None => {
            warn!("Webhook received without hmac parameter");
            gateway.parse_callback(&body)
        }
    }
    .map_err(|e| {
        error!("Webhook rejected: {}", e);
        store_error_to_response(e)
    })?;

    let order = state
        .store
        .find_by_gateway_order(&callback.gateway_order_id)
        .await
        .map_err(store_error_to_response)?;

    if let Some(txn_id) = &callback.transaction_id {
        state
            .store
            .record_gateway_txn(order.id, txn_id)
            .await
            .map_err(store_error_to_response)?;
    }

    let status = order.status().map_err(store_error_to_response)?;
    if status.is_terminal() {
        info!(
            "Webhook replay for order {} ({}), skipping",
            order.id, status
        );
        return Ok(Json(serde_json::json!({ "message": "Already processed" })));
    }

    if callback.success {
        match state.store.fulfill(&order, StockPolicy::ClampToZero).await {
            Ok(_) => info!("Order {} completed via webhook", order.id),
            Err(e) => {
                // Payment is confirmed provider-side; park the order for
                // manual reconciliation instead of failing the webhook
                error!("Fulfillment failed for paid order {}: {}", order.id, e);
                if let Err(mark) = state
                    .store
                    .set_status(order.id, OrderStatus::PaymentConfirmedButFailed)
                    .await
                {
                    error!("Could not park order {}: {}", order.id, mark);
                }
            }
        }
    } else {
        info!("Payment declined for order {}", order.id);
        if let Err(e) = state
            .store
            .set_status(order.id, OrderStatus::PaymentFailed)
            .await
        {
            warn!("Could not mark order {} failed: {}", order.id, e);
        }
    }

    Ok(Json(serde_json::json!({ "message": "Processed" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_wallet_number_validation() {
        assert!(is_valid_wallet_number("01012345678"));
        assert!(is_valid_wallet_number("01298765432"));

        assert!(!is_valid_wallet_number("0101234567")); // too short
        assert!(!is_valid_wallet_number("010123456789")); // too long
        assert!(!is_valid_wallet_number("02012345678")); // wrong prefix
        assert!(!is_valid_wallet_number("0101234567a")); // non-digit
        assert!(!is_valid_wallet_number("+1012345678"));
        assert!(!is_valid_wallet_number(""));
    }

    #[test]
    fn test_client_completion_requires_pending() {
        assert!(ensure_client_completable(OrderStatus::Pending).is_ok());

        // A declined payment must not be completable by the buyer even
        // though the webhook path may still confirm it later
        let err = ensure_client_completable(OrderStatus::PaymentFailed).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(err.status_code(), 409);

        assert!(ensure_client_completable(OrderStatus::Completed).is_err());
        assert!(ensure_client_completable(OrderStatus::PaymentConfirmedButFailed).is_err());
        assert!(ensure_client_completable(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_customer_from_profile() {
        let user = shop_db::User {
            id: Uuid::new_v4(),
            username: "Mona Hassan".to_string(),
            email: "mona@example.com".to_string(),
            password_hash: String::new(),
            phone: Some("01012345678".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let customer = customer_from(&user);
        assert_eq!(customer.first_name, "Mona");
        assert_eq!(customer.last_name, "Hassan");
        assert_eq!(customer.phone, "01012345678");

        let single = shop_db::User {
            username: "mona".to_string(),
            phone: None,
            ..user
        };
        let customer = customer_from(&single);
        assert_eq!(customer.first_name, "mona");
        assert_eq!(customer.last_name, "NA");
        assert_eq!(customer.phone, "NA");
    }
}
