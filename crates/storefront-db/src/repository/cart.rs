//! # Cart Repository
//!
//! One cart per user, one line per (user, item).
//!
//! Quantities are checked against stock when a line is added or changed,
//! never afterwards. `get_cart` reports the current stock next to every line
//! so a stale cart is visible before checkout rejects it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbResult, StoreResult};
use crate::pool::begin_write;
use crate::repository::catalog::CatalogRepository;
use storefront_core::validation::{validate_cart_size, validate_quantity};
use storefront_core::{new_id, CartLine, CartLineView, CoreError};

/// Repository for cart lines.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Returns the user's cart joined with current catalog values, oldest
    /// line first.
    pub async fn get_cart(&self, user_id: &str) -> DbResult<Vec<CartLineView>> {
        let lines = sqlx::query_as::<_, CartLineView>(
            r#"
            SELECT
                c.id AS line_id,
                c.item_id,
                i.name,
                i.price_cents AS unit_price_cents,
                i.discount_percent,
                c.quantity,
                i.stock,
                i.is_active,
                (i.is_active = 1 AND i.stock >= c.quantity) AS in_stock
            FROM cart_lines c
            JOIN catalog_items i ON i.id = c.item_id
            WHERE c.user_id = ?1
            ORDER BY c.added_at, c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Adds `quantity` units of an item, merging with an existing line.
    ///
    /// ## Errors
    /// - `ItemNotFound` for unknown or soft-deleted items
    /// - `InsufficientStock` when the merged quantity exceeds stock
    /// - `CartTooLarge` when a new line would not fit
    pub async fn add_item(&self, user_id: &str, item_id: &str, quantity: i64) -> StoreResult<CartLine> {
        validate_quantity(quantity)?;

        let mut tx = begin_write(&self.pool).await?;

        let item = CatalogRepository::fetch_on(&mut tx, item_id)
            .await?
            .filter(|item| item.is_active)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;

        let existing = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT id, user_id, item_id, quantity, added_at
            FROM cart_lines
            WHERE user_id = ?1 AND item_id = ?2
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let line = match existing {
            Some(mut line) => {
                let merged = line.quantity + quantity;
                validate_quantity(merged)?;
                item.ensure_available(merged)?;

                sqlx::query("UPDATE cart_lines SET quantity = ?2 WHERE id = ?1")
                    .bind(&line.id)
                    .bind(merged)
                    .execute(&mut *tx)
                    .await?;

                line.quantity = merged;
                line
            }
            None => {
                item.ensure_available(quantity)?;

                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE user_id = ?1")
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;
                if validate_cart_size(count as usize).is_err() {
                    return Err(CoreError::CartTooLarge {
                        max: storefront_core::MAX_CART_LINES,
                    }
                    .into());
                }

                let line = CartLine {
                    id: new_id(),
                    user_id: user_id.to_string(),
                    item_id: item_id.to_string(),
                    quantity,
                    added_at: Utc::now(),
                };

                sqlx::query(
                    r#"
                    INSERT INTO cart_lines (id, user_id, item_id, quantity, added_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&line.id)
                .bind(&line.user_id)
                .bind(&line.item_id)
                .bind(line.quantity)
                .bind(line.added_at)
                .execute(&mut *tx)
                .await?;

                line
            }
        };

        tx.commit().await?;

        debug!(user_id = %user_id, item_id = %item_id, quantity = line.quantity, "Cart line saved");
        Ok(line)
    }

    /// Sets a line's quantity.
    ///
    /// ## Errors
    /// - `CartLineNotFound` when the line is not in this user's cart
    /// - `InsufficientStock` when `quantity` exceeds current stock
    pub async fn update_line(&self, user_id: &str, line_id: &str, quantity: i64) -> StoreResult<()> {
        validate_quantity(quantity)?;

        let mut tx = begin_write(&self.pool).await?;

        let item_id: Option<String> =
            sqlx::query_scalar("SELECT item_id FROM cart_lines WHERE id = ?1 AND user_id = ?2")
                .bind(line_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let item_id = item_id.ok_or_else(|| CoreError::CartLineNotFound(line_id.to_string()))?;

        let item = CatalogRepository::fetch_on(&mut tx, &item_id)
            .await?
            .ok_or_else(|| CoreError::ItemNotFound(item_id.clone()))?;
        item.ensure_available(quantity)?;

        sqlx::query("UPDATE cart_lines SET quantity = ?3 WHERE id = ?1 AND user_id = ?2")
            .bind(line_id)
            .bind(user_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(user_id = %user_id, line_id = %line_id, quantity, "Cart line updated");
        Ok(())
    }

    /// Removes one line from the user's cart.
    pub async fn remove_line(&self, user_id: &str, line_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = ?1 AND user_id = ?2")
            .bind(line_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CartLineNotFound(line_id.to_string()).into());
        }

        Ok(())
    }

    /// Empties the user's cart. Clearing an empty cart succeeds.
    ///
    /// Returns the number of lines removed.
    pub async fn clear(&self, user_id: &str) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let removed = Self::clear_on(&mut conn, user_id).await?;

        info!(user_id = %user_id, removed, "Cart cleared");
        Ok(removed)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Loads raw cart lines on the given connection.
    pub async fn lines_on(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT id, user_id, item_id, quantity, added_at
            FROM cart_lines
            WHERE user_id = ?1
            ORDER BY added_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(lines)
    }

    /// Deletes every line of the user's cart on the given connection.
    pub async fn clear_on(conn: &mut SqliteConnection, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::user::tests::insert_user;
    use storefront_core::{CatalogItem, NewCatalogItem};

    async fn setup() -> (Database, String, CatalogItem) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = insert_user(&db, "reader@example.com").await;
        let item = CatalogItem::create(
            NewCatalogItem {
                name: "Dune".into(),
                description: None,
                category: None,
                price_cents: 1_000,
                discount_percent: 0,
                stock: 3,
            },
            Utc::now(),
        )
        .unwrap();
        db.catalog().insert(&item).await.unwrap();
        (db, user.id, item)
    }

    #[tokio::test]
    async fn test_add_merges_existing_line() {
        let (db, user_id, item) = setup().await;
        let carts = db.carts();

        carts.add_item(&user_id, &item.id, 1).await.unwrap();
        let line = carts.add_item(&user_id, &item.id, 2).await.unwrap();
        assert_eq!(line.quantity, 3);

        let cart = carts.get_cart(&user_id).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 3);
        assert!(cart[0].in_stock);
    }

    #[tokio::test]
    async fn test_add_unknown_item_is_not_found() {
        let (db, user_id, _) = setup().await;
        let result = db.carts().add_item(&user_id, "nope", 1).await;
        assert!(matches!(result, Err(StoreError::Core(CoreError::ItemNotFound(_)))));
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_rejected() {
        let (db, user_id, item) = setup().await;
        let carts = db.carts();

        carts.add_item(&user_id, &item.id, 2).await.unwrap();
        let result = carts.add_item(&user_id, &item.id, 2).await;
        assert!(matches!(
            result,
            Err(StoreError::Core(CoreError::InsufficientStock { available: 3, requested: 4, .. }))
        ));

        // Rejected mutation left the line as it was.
        assert_eq!(carts.get_cart(&user_id).await.unwrap()[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_update_and_remove_line() {
        let (db, user_id, item) = setup().await;
        let carts = db.carts();
        let line = carts.add_item(&user_id, &item.id, 1).await.unwrap();

        carts.update_line(&user_id, &line.id, 3).await.unwrap();
        assert!(matches!(
            carts.update_line(&user_id, &line.id, 4).await,
            Err(StoreError::Core(CoreError::InsufficientStock { .. }))
        ));
        assert!(matches!(
            carts.update_line(&user_id, "missing", 1).await,
            Err(StoreError::Core(CoreError::CartLineNotFound(_)))
        ));

        carts.remove_line(&user_id, &line.id).await.unwrap();
        assert!(carts.get_cart(&user_id).await.unwrap().is_empty());
        assert!(carts.remove_line(&user_id, &line.id).await.is_err());
    }

    #[tokio::test]
    async fn test_lines_are_private_to_their_owner() {
        let (db, user_id, item) = setup().await;
        let other = insert_user(&db, "other@example.com").await;
        let line = db.carts().add_item(&user_id, &item.id, 1).await.unwrap();

        assert!(db.carts().remove_line(&other.id, &line.id).await.is_err());
        assert!(db.carts().get_cart(&other.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (db, user_id, item) = setup().await;
        let carts = db.carts();
        carts.add_item(&user_id, &item.id, 1).await.unwrap();

        assert_eq!(carts.clear(&user_id).await.unwrap(), 1);
        assert_eq!(carts.clear(&user_id).await.unwrap(), 0);
        assert!(carts.get_cart(&user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cart_view_shows_stale_line() {
        let (db, user_id, mut item) = setup().await;
        db.carts().add_item(&user_id, &item.id, 3).await.unwrap();

        item.stock = 1;
        db.catalog().update(&item).await.unwrap();

        let cart = db.carts().get_cart(&user_id).await.unwrap();
        assert_eq!(cart[0].quantity, 3);
        assert_eq!(cart[0].stock, 1);
        assert!(!cart[0].in_stock);
    }
}
