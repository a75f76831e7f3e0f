//! # shop-api
//!
//! HTTP API layer for shopfront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - JWT auth (register/login/refresh) with Argon2 password hashing
//! - REST endpoints for catalog, cart, and orders
//! - Paymob payment orchestration and webhook reconciliation
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/auth/register` | Create an account |
//! | POST | `/api/auth/login` | Log in |
//! | POST | `/api/auth/refresh` | Refresh the token pair |
//! | GET | `/api/products` | List products |
//! | GET | `/api/cart` | View cart |
//! | POST | `/api/orders` | Checkout |
//! | POST | `/api/orders/wallet-pay` | Mobile wallet charge |
//! | POST | `/api/orders/webhook/paymob` | Paymob webhook |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
