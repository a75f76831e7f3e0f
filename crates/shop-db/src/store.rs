//! # Store
//!
//! The persistence facade. All queries use runtime binding
//! (`sqlx::query_as`), so the crate builds without a live database.
//! The two multi-statement operations (`create_order_from_cart`,
//! `fulfill`) each run inside a single transaction.

use crate::models::{
    CartLine, HistoryItem, NewUser, Order, OrderItem, Product, ProfileUpdate, User,
};
use shop_core::{OrderStatus, StoreError, StoreResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// How fulfillment treats a stock shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockPolicy {
    /// Reject the operation if any product would go negative
    /// (client-driven completion, payment not yet confirmed)
    Strict,
    /// Clamp stock at zero: the provider already captured the payment,
    /// so fulfillment must not fail on a stale count
    ClampToZero,
}

/// An order freshly created from a cart, with the lines it was built from
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<CartLine>,
}

/// PostgreSQL-backed store for users, catalog, carts, and orders
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect to the database
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Configuration(format!("Migration failed: {e}")))?;
        info!("Database migrations applied");
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    #[instrument(skip(self, new), fields(username = %new.username))]
    pub async fn create_user(&self, new: &NewUser) -> StoreResult<User> {
        let existing = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 OR email = $2",
        )
        .bind(&new.username)
        .bind(&new.email)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Err(StoreError::Conflict(
                "User already exists with this username or email".to_string(),
            ));
        }

        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash, phone) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // Concurrent registration can still hit the unique index
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(
                "User already exists with this username or email".to_string(),
            ),
            _ => StoreError::Database(e),
        })
    }

    pub async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_user(&self, user_id: Uuid) -> StoreResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::Unauthorized("User not found".to_string()))
    }

    /// Update profile fields; `None` fields are left unchanged.
    /// Fails with `Conflict` if the new username/email belongs to another
    /// user.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> StoreResult<User> {
        if update.is_empty() {
            return Err(StoreError::InvalidRequest(
                "No fields provided to update".to_string(),
            ));
        }

        if update.username.is_some() || update.email.is_some() {
            let conflict = sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE id <> $1 AND \
                 (($2::text IS NOT NULL AND username = $2) OR \
                  ($3::text IS NOT NULL AND email = $3))",
            )
            .bind(user_id)
            .bind(&update.username)
            .bind(&update.email)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(other) = conflict {
                let field = if update.username.as_deref() == Some(other.username.as_str()) {
                    "username"
                } else {
                    "email"
                };
                return Err(StoreError::Conflict(format!(
                    "A user already exists with this {field}"
                )));
            }
        }

        sqlx::query_as::<_, User>(
            "UPDATE users SET \
             username = COALESCE($2, username), \
             email = COALESCE($3, email), \
             phone = COALESCE($4, phone), \
             updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.phone)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::Unauthorized("User not found".to_string()))
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE active ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn get_product(&self, product_id: Uuid) -> StoreResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ProductNotFound {
                product_id: product_id.to_string(),
            })
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT p.id AS product_id, p.name, p.description, p.photo_url, \
                    p.price_cents, p.stock_quantity, c.quantity \
             FROM cart_items c \
             JOIN products p ON p.id = c.product_id \
             WHERE c.user_id = $1 \
             ORDER BY c.added_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    /// Add a product to the cart; quantities accumulate on repeat adds
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> StoreResult<()> {
        if quantity <= 0 {
            return Err(StoreError::InvalidRequest(
                "Quantity must be positive".to_string(),
            ));
        }

        let product = self.get_product(product_id).await?;
        if !product.active {
            return Err(StoreError::InvalidRequest(format!(
                "Product is not available: {}",
                product.name
            )));
        }

        sqlx::query(
            "INSERT INTO cart_items (id, user_id, product_id, quantity) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, product_id) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_cart_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> StoreResult<()> {
        if quantity <= 0 {
            return Err(StoreError::InvalidRequest(
                "Quantity must be positive".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound {
                product_id: product_id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_cart(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create a `pending` order from the user's cart in one transaction:
    /// load the cart with its products (stock rows locked), validate every
    /// line against stock, compute the total, insert the order and its
    /// items with price-at-purchase.
    #[instrument(skip(self))]
    pub async fn create_order_from_cart(
        &self,
        user_id: Uuid,
        currency: &str,
    ) -> StoreResult<PlacedOrder> {
        let mut tx = self.pool.begin().await?;

        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT p.id AS product_id, p.name, p.description, p.photo_url, \
                    p.price_cents, p.stock_quantity, c.quantity \
             FROM cart_items c \
             JOIN products p ON p.id = c.product_id \
             WHERE c.user_id = $1 \
             ORDER BY c.added_at \
             FOR UPDATE OF p",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(StoreError::InvalidRequest("Cart is empty".to_string()));
        }

        for line in &lines {
            if line.stock_quantity < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product_name: line.name.clone(),
                    available: line.stock_quantity,
                });
            }
        }

        let total: i64 = lines.iter().map(CartLine::total_cents).sum();

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (id, user_id, status, total_amount_cents, currency) \
             VALUES ($1, $2, 'pending', $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(total)
        .bind(currency)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                "INSERT INTO order_items \
                 (id, order_id, product_id, quantity, price_at_purchase_cents) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Created order {} for user {}: {} lines, total {} {}",
            order.id,
            user_id,
            lines.len(),
            total,
            currency
        );

        Ok(PlacedOrder { order, lines })
    }

    /// Record the provider-side order ID once payment setup succeeds
    pub async fn attach_gateway_order(
        &self,
        order_id: Uuid,
        gateway_order_id: &str,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE orders SET gateway_order_id = $2 WHERE id = $1")
            .bind(order_id)
            .bind(gateway_order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record the provider's transaction ID from the callback
    pub async fn record_gateway_txn(&self, order_id: Uuid, txn_id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE orders SET gateway_txn_id = $2 WHERE id = $1")
            .bind(order_id)
            .bind(txn_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_order_for_user(&self, order_id: Uuid, user_id: Uuid) -> StoreResult<Order> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    pub async fn find_by_gateway_order(&self, gateway_order_id: &str) -> StoreResult<Order> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE gateway_order_id = $1")
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound {
                order_id: gateway_order_id.to_string(),
            })
    }

    /// Move an order to a new status, enforcing the transition table
    #[instrument(skip(self))]
    pub async fn set_status(&self, order_id: Uuid, to: OrderStatus) -> StoreResult<Order> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        let from = order.status()?;
        from.transition(to)?;

        // Guard on the status we validated so a concurrent writer cannot
        // slip between the read and the update
        let updated = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $2 WHERE id = $1 AND status = $3 RETURNING *",
        )
        .bind(order_id)
        .bind(to.as_str())
        .bind(from.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            StoreError::Conflict(format!("Order {order_id} was updated concurrently"))
        })?;

        info!("Order {} status: {} -> {}", order_id, from, to);
        Ok(updated)
    }

    /// Fulfill a paid order in one transaction: decrement stock for every
    /// item, clear the buyer's cart, transition to `Completed`.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn fulfill(&self, order: &Order, policy: StockPolicy) -> StoreResult<Order> {
        // Reject illegal transitions before touching stock
        let from = order.status()?;
        from.transition(OrderStatus::Completed)?;

        let mut tx = self.pool.begin().await?;

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            match policy {
                StockPolicy::Strict => {
                    let result = sqlx::query(
                        "UPDATE products \
                         SET stock_quantity = stock_quantity - $1, updated_at = now() \
                         WHERE id = $2 AND stock_quantity >= $1",
                    )
                    .bind(item.quantity)
                    .bind(item.product_id)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        let (name, available) = sqlx::query_as::<_, (String, i64)>(
                            "SELECT name, stock_quantity FROM products WHERE id = $1",
                        )
                        .bind(item.product_id)
                        .fetch_one(&mut *tx)
                        .await?;

                        return Err(StoreError::InsufficientStock {
                            product_name: name,
                            available,
                        });
                    }
                }
                StockPolicy::ClampToZero => {
                    // Payment already captured; a stale count must not
                    // block fulfillment
                    let result = sqlx::query(
                        "UPDATE products \
                         SET stock_quantity = GREATEST(stock_quantity - $1, 0), \
                             updated_at = now() \
                         WHERE id = $2",
                    )
                    .bind(item.quantity)
                    .bind(item.product_id)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        warn!(
                            "Order {} references missing product {}",
                            order.id, item.product_id
                        );
                    }
                }
            }
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(order.user_id)
            .execute(&mut *tx)
            .await?;

        // Guarded on the starting status: if a concurrent delivery already
        // completed the order this matches zero rows and the whole
        // transaction (stock decrements included) rolls back
        let updated = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $2 WHERE id = $1 AND status = $3 RETURNING *",
        )
        .bind(order.id)
        .bind(OrderStatus::Completed.as_str())
        .bind(from.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            StoreError::Conflict(format!("Order {} was processed concurrently", order.id))
        })?;

        tx.commit().await?;

        info!("Order {} fulfilled ({} items)", order.id, items.len());
        Ok(updated)
    }

    /// Orders for a user, newest first, each with its item details
    pub async fn order_history(&self, user_id: Uuid) -> StoreResult<Vec<(Order, Vec<HistoryItem>)>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY order_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut history = Vec::with_capacity(orders.len());
        for order in orders {
            let items = sqlx::query_as::<_, HistoryItem>(
                "SELECT p.name, p.photo_url, oi.price_at_purchase_cents, oi.quantity \
                 FROM order_items oi \
                 JOIN products p ON p.id = oi.product_id \
                 WHERE oi.order_id = $1",
            )
            .bind(order.id)
            .fetch_all(&self.pool)
            .await?;
            history.push((order, items));
        }
        Ok(history)
    }
}
