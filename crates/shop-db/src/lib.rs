//! # shop-db
//!
//! PostgreSQL persistence for shopfront-rs: users, product catalog,
//! carts, and orders with their payment bookkeeping. The [`Store`]
//! facade owns the connection pool; migrations live in `migrations/`
//! and are applied with [`Store::run_migrations`].

pub mod models;
pub mod store;

// Re-exports
pub use models::{CartItem, CartLine, HistoryItem, NewUser, Order, OrderItem, Product, ProfileUpdate, User};
pub use store::{PlacedOrder, StockPolicy, Store};
