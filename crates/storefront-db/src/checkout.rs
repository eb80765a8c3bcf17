//! # Checkout
//!
//! Turns a user's cart into an order.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │          BEGIN IMMEDIATE (one SQLite transaction)                       │
//! │                                                                         │
//! │  1. Load cart lines ───────────────► none? ──► EmptyCart               │
//! │  2. Re-read each item ─────────────► gone? ──► ItemNotFound            │
//! │                          stock < qty? ──► InsufficientStock(item)      │
//! │  3. Snapshot OrderLines (name, price, discount frozen)                 │
//! │  4. pricing::calculate → subtotal, shipping, tax, total                │
//! │  5. INSERT order (pending / pending) + lines                           │
//! │  6. UPDATE stock = stock - qty WHERE stock >= qty   (per line)         │
//! │       0 rows? ──► InsufficientStock(item)                              │
//! │  7. DELETE cart lines                                                  │
//! │                                                                         │
//! │                COMMIT ──► return Order                                  │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: no order, stock and    │
//! │  cart exactly as they were.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Placement is not idempotent. A client that loses the response must look
//! at `GET /api/orders/mine` rather than retry.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use storefront_core::pricing::{self, PricingConfig};
use storefront_core::validation::validate_shipping_address;
use storefront_core::{CoreError, Order, OrderLine, PaymentMethod, ShippingAddress};

use crate::error::StoreError;
use crate::pool::begin_write;
use crate::repository::cart::CartRepository;
use crate::repository::catalog::CatalogRepository;
use crate::repository::order::OrderRepository;

/// Errors from order placement: a broken business rule or a database failure.
pub type CheckoutError = StoreError;

/// Order placement orchestrator.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    pricing: PricingConfig,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool, pricing: PricingConfig) -> Self {
        CheckoutService { pool, pricing }
    }

    /// Places an order from the user's current cart.
    ///
    /// ## Errors
    /// - `Validation` for a blank address field (checked before any read)
    /// - `EmptyCart` when the cart has no lines
    /// - `ItemNotFound` when a cart line points at a removed item
    /// - `InsufficientStock` naming the first item that cannot be filled
    /// - `Db` for persistence failures
    ///
    /// In every error case nothing is written.
    pub async fn place_order(
        &self,
        user_id: &str,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Order, CheckoutError> {
        let shipping_address = shipping_address.trimmed();
        validate_shipping_address(&shipping_address)?;

        let mut tx = begin_write(&self.pool).await?;

        // 1. cart
        let cart = CartRepository::lines_on(&mut tx, user_id).await?;
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        // 2-3. availability and snapshots
        let mut lines = Vec::with_capacity(cart.len());
        for cart_line in &cart {
            let item = CatalogRepository::fetch_on(&mut tx, &cart_line.item_id)
                .await?
                .ok_or_else(|| CoreError::ItemNotFound(cart_line.item_id.clone()))?;

            item.ensure_available(cart_line.quantity)?;
            lines.push(OrderLine::snapshot(&item, cart_line.quantity)?);
        }

        // 4. pricing
        let inputs: Vec<_> = lines.iter().map(OrderLine::price_input).collect();
        let breakdown = pricing::calculate(&inputs, &self.pricing)?;

        // 5. order
        let order = Order::new_pending(
            user_id,
            lines,
            shipping_address,
            payment_method,
            &breakdown,
            Utc::now(),
        );
        OrderRepository::insert(&mut tx, &order).await?;

        // 6. stock
        for line in &order.lines {
            let decremented =
                CatalogRepository::try_decrement_stock(&mut tx, &line.item_id, line.quantity).await?;

            if !decremented {
                let available = CatalogRepository::fetch_on(&mut tx, &line.item_id)
                    .await?
                    .map(|item| item.stock)
                    .unwrap_or(0);

                warn!(
                    user_id = %user_id,
                    item_id = %line.item_id,
                    available,
                    requested = line.quantity,
                    "Stock changed during checkout, rolling back"
                );
                return Err(CoreError::insufficient_stock(&line.name, available, line.quantity).into());
            }
        }

        // 7. cart
        CartRepository::clear_on(&mut tx, user_id).await?;

        tx.commit().await?;

        info!(
            order_id = %order.id,
            user_id = %user_id,
            lines = order.lines.len(),
            total = %order.total(),
            "Order placed"
        );
        Ok(order)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::user::tests::insert_user;
    use storefront_core::{CatalogItem, NewCatalogItem, OrderStatus, PaymentStatus};

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip: "62701".into(),
            country: "US".into(),
        }
    }

    async fn insert_item(db: &Database, name: &str, price_cents: i64, discount: u8, stock: i64) -> CatalogItem {
        let item = CatalogItem::create(
            NewCatalogItem {
                name: name.into(),
                description: None,
                category: None,
                price_cents,
                discount_percent: discount,
                stock,
            },
            Utc::now(),
        )
        .unwrap();
        db.catalog().insert(&item).await.unwrap();
        item
    }

    async fn setup() -> (Database, CheckoutService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let checkout = db.checkout(PricingConfig::default());
        (db, checkout)
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.catalog().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (db, checkout) = setup().await;
        let user = insert_user(&db, "reader@example.com").await;
        let item = insert_item(&db, "Item A", 10_000, 10, 5).await;
        db.carts().add_item(&user.id, &item.id, 2).await.unwrap();

        let order = checkout
            .place_order(&user.id, address(), PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(order.subtotal_cents, 18_000);
        assert_eq!(order.shipping_cents, 0);
        assert_eq!(order.tax_cents, 1_800);
        assert_eq!(order.total_cents, 19_800);
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].name, "Item A");

        assert_eq!(stock_of(&db, &item.id).await, 3);
        assert!(db.carts().get_cart(&user.id).await.unwrap().is_empty());

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines, order.lines);
        assert_eq!(stored.total_cents, 19_800);
        assert_eq!(stored.user_id, user.id);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let (db, checkout) = setup().await;
        let user = insert_user(&db, "reader@example.com").await;
        let item = insert_item(&db, "Dune", 1_000, 0, 10).await;
        db.carts().add_item(&user.id, &item.id, 10).await.unwrap();

        // Stock drops after the item went into the cart.
        let mut stale = item.clone();
        stale.stock = 3;
        db.catalog().update(&stale).await.unwrap();

        let err = checkout
            .place_order(&user.id, address(), PaymentMethod::Card)
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            StoreError::Core(CoreError::InsufficientStock { available: 3, requested: 10, .. })
        ));
        assert!(err.to_string().contains("Dune"));
        assert_eq!(stock_of(&db, &item.id).await, 3);
        assert_eq!(db.carts().get_cart(&user.id).await.unwrap()[0].quantity, 10);
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_line_short_rolls_back_first() {
        let (db, checkout) = setup().await;
        let user = insert_user(&db, "reader@example.com").await;
        let plenty = insert_item(&db, "Plenty", 500, 0, 10).await;
        let scarce = insert_item(&db, "Scarce", 500, 0, 5).await;
        db.carts().add_item(&user.id, &plenty.id, 2).await.unwrap();
        db.carts().add_item(&user.id, &scarce.id, 5).await.unwrap();

        let mut drained = scarce.clone();
        drained.stock = 0;
        db.catalog().update(&drained).await.unwrap();

        assert!(checkout
            .place_order(&user.id, address(), PaymentMethod::Card)
            .await
            .is_err());
        assert_eq!(stock_of(&db, &plenty.id).await, 10);
        assert_eq!(db.carts().get_cart(&user.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let (db, checkout) = setup().await;
        let user = insert_user(&db, "reader@example.com").await;

        let err = checkout
            .place_order(&user.id, address(), PaymentMethod::Card)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Core(CoreError::EmptyCart)));
        assert_eq!(err.to_string(), "Cart is empty");
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_removed_item_in_cart() {
        let (db, checkout) = setup().await;
        let user = insert_user(&db, "reader@example.com").await;
        let item = insert_item(&db, "Gone", 500, 0, 5).await;
        db.carts().add_item(&user.id, &item.id, 1).await.unwrap();
        db.catalog().soft_delete(&item.id).await.unwrap();

        let err = checkout
            .place_order(&user.id, address(), PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_address_is_rejected_before_reading_cart() {
        let (db, checkout) = setup().await;
        let user = insert_user(&db, "reader@example.com").await;

        let mut bad = address();
        bad.zip = "  ".into();
        let err = checkout
            .place_order(&user.id, bad, PaymentMethod::CashOnDelivery)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_later_price_change_does_not_touch_order() {
        let (db, checkout) = setup().await;
        let user = insert_user(&db, "reader@example.com").await;
        let item = insert_item(&db, "Dune", 2_500, 0, 5).await;
        db.carts().add_item(&user.id, &item.id, 1).await.unwrap();

        let order = checkout
            .place_order(&user.id, address(), PaymentMethod::Card)
            .await
            .unwrap();

        let mut repriced = db.catalog().get_by_id(&item.id).await.unwrap().unwrap();
        repriced.price_cents = 9_999;
        repriced.discount_percent = 50;
        db.catalog().update(&repriced).await.unwrap();

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines[0].unit_price_cents, 2_500);
        assert_eq!(stored.lines[0].discount_percent, 0);
        assert_eq!(stored.subtotal_cents, 2_500);
        assert_eq!(stored.total_cents, order.total_cents);
    }

    // -------------------------------------------------------------------------
    // File-backed store: real concurrent writers
    // -------------------------------------------------------------------------

    async fn file_setup(dir: &tempfile::TempDir) -> (Database, CheckoutService) {
        let config = DbConfig::new(dir.path().join("storefront.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();
        let checkout = db.checkout(PricingConfig::default());
        (db, checkout)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_checkouts_on_one_item_never_oversell() {
        let dir = tempfile::TempDir::new().unwrap();
        let (db, checkout) = file_setup(&dir).await;
        let item = insert_item(&db, "Last Copies", 1_000, 0, 3).await;

        let mut users = Vec::new();
        for n in 0..5 {
            let user = insert_user(&db, &format!("buyer{}@example.com", n)).await;
            db.carts().add_item(&user.id, &item.id, 1).await.unwrap();
            users.push(user.id);
        }

        let handles: Vec<_> = users
            .into_iter()
            .map(|user_id| {
                let checkout = checkout.clone();
                tokio::spawn(async move { checkout.place_order(&user_id, address(), PaymentMethod::Card).await })
            })
            .collect();

        let mut placed = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(StoreError::Core(CoreError::InsufficientStock { requested: 1, .. })) => short += 1,
                Err(other) => panic!("unexpected checkout failure: {}", other),
            }
        }

        assert_eq!(placed, 3);
        assert_eq!(short, 2);
        assert_eq!(stock_of(&db, &item.id).await, 0);
        assert_eq!(db.orders().count().await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_checkouts_on_different_items_all_succeed() {
        let dir = tempfile::TempDir::new().unwrap();
        let (db, checkout) = file_setup(&dir).await;

        let mut buyers = Vec::new();
        for n in 0..4 {
            let user = insert_user(&db, &format!("shopper{}@example.com", n)).await;
            let item = insert_item(&db, &format!("Item {}", n), 1_000, 0, 1_000).await;
            buyers.push((user.id, item.id));
        }

        const ROUNDS: i64 = 10;
        for _ in 0..ROUNDS {
            for (user_id, item_id) in &buyers {
                db.carts().add_item(user_id, item_id, 1).await.unwrap();
            }

            let handles: Vec<_> = buyers
                .iter()
                .map(|(user_id, _)| {
                    let checkout = checkout.clone();
                    let user_id = user_id.clone();
                    tokio::spawn(async move { checkout.place_order(&user_id, address(), PaymentMethod::Card).await })
                })
                .collect();

            for handle in handles {
                let result = handle.await.unwrap();
                assert!(result.is_ok(), "checkout failed: {:?}", result.err());
            }
        }

        for (_, item_id) in &buyers {
            assert_eq!(stock_of(&db, item_id).await, 1_000 - ROUNDS);
        }
        assert_eq!(db.orders().count().await.unwrap(), buyers.len() as i64 * ROUNDS);
    }
}
