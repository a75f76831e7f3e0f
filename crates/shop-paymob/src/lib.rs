//! # shop-paymob
//!
//! Paymob Accept payment gateway for shopfront-rs.
//!
//! Implements `shop_core::PaymentGateway` over Accept's mobile-wallet API:
//! the sequential payment setup (auth token → order registration → payment
//! key), the direct wallet charge, and HMAC-SHA512 webhook verification.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_paymob::PaymobGateway;
//! use shop_core::PaymentGateway;
//!
//! let gateway = PaymobGateway::from_env()?;
//!
//! let intent = gateway.create_payment(&order, &customer).await?;
//! // Hand intent.payment_token / intent.payment_url to the client.
//!
//! let charge = gateway.wallet_charge(&intent.payment_token, "01012345678").await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! // In the webhook endpoint (hmac arrives as a query parameter):
//! let callback = gateway.verify_callback(&body, &hmac)?;
//! if callback.success { /* fulfill the order */ }
//! ```

pub mod client;
pub mod config;
pub mod webhook;

// Re-exports
pub use client::PaymobGateway;
pub use config::PaymobConfig;
pub use webhook::{canonical_string, compute_signature, parse_callback, verify_signature};
