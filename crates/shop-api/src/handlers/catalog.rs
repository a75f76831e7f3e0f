//! Catalog handlers: product listing and lookup. Public, no auth.

use crate::handlers::{store_error_to_response, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

/// List active products
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let products = state
        .store
        .list_products()
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(serde_json::json!({
        "products": products,
        "count": products.len()
    })))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let product = state
        .store
        .get_product(product_id)
        .await
        .map_err(store_error_to_response)?;

    Ok(Json(product))
}
