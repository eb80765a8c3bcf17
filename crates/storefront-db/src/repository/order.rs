//! # Order Repository
//!
//! Orders are written once by checkout and afterwards only their status
//! fields change.
//!
//! ## Storage Layout
//! ```text
//! orders (1) ──────< order_lines (n)
//!   id                 order_id, position
//!   ship_* columns     item_id, name          (snapshots)
//!   totals in cents    unit_price_cents, discount_percent, line_total_cents
//!   statuses + stamps
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult, StoreResult};
use crate::pool::begin_write;
use storefront_core::{
    CoreError, Order, OrderLine, OrderStatus, OrderStatusUpdate, PaymentMethod, PaymentStatus,
    ShippingAddress,
};

const ORDER_COLUMNS: &str = r#"
    id, user_id,
    ship_street, ship_city, ship_state, ship_zip, ship_country,
    payment_method,
    subtotal_cents, shipping_cents, tax_cents, total_cents,
    order_status, payment_status,
    created_at, updated_at, delivered_at, paid_at
"#;

/// Flat `orders` row before its lines are attached.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    ship_street: String,
    ship_city: String,
    ship_state: String,
    ship_zip: String,
    ship_country: String,
    payment_method: PaymentMethod,
    subtotal_cents: i64,
    shipping_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    order_status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            lines,
            shipping_address: ShippingAddress {
                street: self.ship_street,
                city: self.ship_city,
                state: self.ship_state,
                zip: self.ship_zip,
                country: self.ship_country,
            },
            payment_method: self.payment_method,
            subtotal_cents: self.subtotal_cents,
            shipping_cents: self.shipping_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            order_status: self.order_status,
            payment_status: self.payment_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            delivered_at: self.delivered_at,
            paid_at: self.paid_at,
        }
    }
}

/// Repository for orders and their line snapshots.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order and its lines on the given connection.
    ///
    /// Called by checkout inside its transaction.
    pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, user_id = %order.user_id, lines = order.lines.len(), "Inserting order");

        let address = &order.shipping_address;
        sqlx::query(&format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#
        ))
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip)
        .bind(&address.country)
        .bind(order.payment_method)
        .bind(order.subtotal_cents)
        .bind(order.shipping_cents)
        .bind(order.tax_cents)
        .bind(order.total_cents)
        .bind(order.order_status)
        .bind(order.payment_status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.delivered_at)
        .bind(order.paid_at)
        .execute(&mut *conn)
        .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    order_id, position, item_id, name, quantity,
                    unit_price_cents, discount_percent, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&order.id)
            .bind(position as i64)
            .bind(&line.item_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.discount_percent)
            .bind(line.line_total_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Gets an order with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_on(&mut conn, id).await
    }

    /// Lists the user's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = ?1
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Self::attach_lines(&mut conn, rows).await
    }

    /// Lists every order, newest first, optionally filtered by status.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;

        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    r#"
                    SELECT {ORDER_COLUMNS} FROM orders
                    WHERE order_status = ?1
                    ORDER BY created_at DESC, id
                    "#
                ))
                .bind(status)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id"
                ))
                .fetch_all(&mut *conn)
                .await?
            }
        };

        Self::attach_lines(&mut conn, rows).await
    }

    /// Applies an administrative status change and returns the new order.
    ///
    /// Only the status fields and their timestamps are written; totals and
    /// lines are never touched.
    pub async fn update_status(&self, id: &str, update: OrderStatusUpdate) -> StoreResult<Order> {
        let mut tx = begin_write(&self.pool).await?;

        let mut order = Self::fetch_on(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        update.apply(&mut order, Utc::now());

        sqlx::query(
            r#"
            UPDATE orders SET
                order_status = ?2,
                payment_status = ?3,
                delivered_at = ?4,
                paid_at = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(order.order_status)
        .bind(order.payment_status)
        .bind(order.delivered_at)
        .bind(order.paid_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %order.id,
            order_status = %order.order_status,
            payment_status = %order.payment_status,
            "Order status updated"
        );
        Ok(order)
    }

    /// Counts orders, used by tests and diagnostics.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn fetch_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let lines = Self::lines_on(conn, &row.id).await?;
                Ok(Some(row.into_order(lines)))
            }
            None => Ok(None),
        }
    }

    async fn lines_on(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT item_id, name, quantity, unit_price_cents, discount_percent, line_total_cents
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(lines)
    }

    async fn attach_lines(conn: &mut SqliteConnection, rows: Vec<OrderRow>) -> DbResult<Vec<Order>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = Self::lines_on(conn, &row.id).await?;
            if lines.is_empty() {
                return Err(DbError::Internal(format!("order {} has no lines", row.id)));
            }
            orders.push(row.into_order(lines));
        }
        Ok(orders)
    }
}

// =============================================================================
// Tests
// =============================================================================
