//! # Table Models
//!
//! Row types for the storefront tables. Statuses are stored as snake_case
//! text; `Order::status()` parses into the typed state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_core::{Currency, OrderStatus, StoreResult};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)] // Never send the password hash to clients
    pub password_hash: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for registering a user (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
}

/// Profile fields that may be updated; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

/// A cart row joined with its product (checkout and cart views)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub quantity: i64,
}

impl CartLine {
    /// Line total in the smallest currency unit
    pub fn total_cents(&self) -> i64 {
        self.price_cents * self.quantity
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_amount_cents: i64,
    pub currency: String,
    pub gateway_order_id: Option<String>,
    pub gateway_txn_id: Option<String>,
    pub order_date: DateTime<Utc>,
}

impl Order {
    /// Parse the stored status into the typed state machine
    pub fn status(&self) -> StoreResult<OrderStatus> {
        self.status.parse()
    }

    /// Parse the stored currency code (EGP if unrecognized)
    pub fn currency(&self) -> Currency {
        Currency::from_code(&self.currency).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub price_at_purchase_cents: i64,
}

/// An order item joined with its product, for order history
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HistoryItem {
    pub name: String,
    pub photo_url: Option<String>,
    pub price_at_purchase_cents: i64,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_status(status: &str) -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: status.to_string(),
            total_amount_cents: 15000,
            currency: "EGP".to_string(),
            gateway_order_id: None,
            gateway_txn_id: None,
            order_date: Utc::now(),
        }
    }

    #[test]
    fn test_order_status_parse() {
        let order = order_with_status("payment_confirmed_but_failed");
        assert_eq!(
            order.status().unwrap(),
            OrderStatus::PaymentConfirmedButFailed
        );

        let bad = order_with_status("refunded");
        assert!(bad.status().is_err());
    }

    #[test]
    fn test_cart_line_total() {
        let line = CartLine {
            product_id: Uuid::new_v4(),
            name: "Widget".to_string(),
            description: None,
            photo_url: None,
            price_cents: 7500,
            stock_quantity: 10,
            quantity: 2,
        };
        assert_eq!(line.total_cents(), 15000);
    }

    #[test]
    fn test_user_serializes_without_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "mona".to_string(),
            email: "mona@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "mona");
    }
}
