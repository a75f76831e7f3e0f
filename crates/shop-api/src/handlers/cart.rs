//! Cart handlers. All routes require an authenticated user; the cart is
//! keyed by the caller, never by a client-supplied user ID.

use crate::auth::AuthUser;
use crate::handlers::{store_error_to_response, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_db::CartLine;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

/// The cart with its line and grand totals
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub count: usize,
    pub total_cents: i64,
}

impl CartView {
    fn from_lines(items: Vec<CartLine>) -> Self {
        let total_cents = items.iter().map(CartLine::total_cents).sum();
        Self {
            count: items.len(),
            total_cents,
            items,
        }
    }
}

/// The authenticated user's cart
pub async fn view_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CartView>, (StatusCode, Json<ErrorResponse>)> {
    let lines = state
        .store
        .cart_lines(user.user_id)
        .await
        .map_err(store_error_to_response)?;
    Ok(Json(CartView::from_lines(lines)))
}

/// Add a product to the cart (quantities accumulate)
#[instrument(skip(state), fields(user_id = %user.user_id, product_id = %request.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .add_to_cart(user.user_id, request.product_id, request.quantity)
        .await
        .map_err(store_error_to_response)?;

    let lines = state
        .store
        .cart_lines(user.user_id)
        .await
        .map_err(store_error_to_response)?;

    Ok((StatusCode::CREATED, Json(CartView::from_lines(lines))))
}

/// Set the quantity of a cart line
#[instrument(skip(state), fields(user_id = %user.user_id, product_id = %product_id))]
pub async fn set_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<CartView>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .set_cart_quantity(user.user_id, product_id, request.quantity)
        .await
        .map_err(store_error_to_response)?;

    let lines = state
        .store
        .cart_lines(user.user_id)
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(CartView::from_lines(lines)))
}

/// Remove a single product from the cart
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .remove_cart_item(user.user_id, product_id)
        .await
        .map_err(store_error_to_response)?;

    let lines = state
        .store
        .cart_lines(user.user_id)
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(CartView::from_lines(lines)))
}

/// Empty the cart
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .clear_cart(user.user_id)
        .await
        .map_err(store_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_view_totals() {
        let line = |price, qty| CartLine {
            product_id: Uuid::new_v4(),
            name: "Widget".to_string(),
            description: None,
            photo_url: None,
            price_cents: price,
            stock_quantity: 50,
            quantity: qty,
        };

        let view = CartView::from_lines(vec![line(2500, 2), line(10000, 1)]);
        assert_eq!(view.count, 2);
        assert_eq!(view.total_cents, 15000);

        let empty = CartView::from_lines(vec![]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.total_cents, 0);
    }
}
