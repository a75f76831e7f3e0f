//! # shop-core
//!
//! Core types and traits for the shopfront storefront.
//!
//! This crate provides:
//! - `StoreError` for typed error handling
//! - `Money` and `Currency` for amounts in the smallest currency unit
//! - `OrderStatus` and its transition table
//! - `PaymentGateway` trait for payment providers, plus the data types
//!   that cross that seam
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CheckoutOrder, Currency, OrderStatus, PaymentGateway};
//!
//! // After creating the order row in its own transaction:
//! let intent = gateway.create_payment(&checkout_order, &customer).await?;
//!
//! // Later, from the provider's callback:
//! let callback = gateway.verify_callback(&body, &hmac)?;
//! if callback.success {
//!     store.fulfill(&order, StockPolicy::ClampToZero).await?;
//! }
//! ```

pub mod error;
pub mod gateway;
pub mod money;
pub mod order;

// Re-exports for convenience
pub use error::{StoreError, StoreResult};
pub use gateway::{
    BoxedPaymentGateway, CheckoutLine, CheckoutOrder, Customer, GatewaySelector, PaymentGateway,
    PaymentIntent, TransactionCallback, WalletCharge,
};
pub use money::{Currency, Money};
pub use order::OrderStatus;
