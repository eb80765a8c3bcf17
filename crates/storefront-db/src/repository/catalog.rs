//! # Catalog Repository
//!
//! Database operations for catalog items.
//!
//! ## Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Read-then-write (racy):                                               │
//! │    SELECT stock → 3      SELECT stock → 3                              │
//! │    UPDATE stock = 1      UPDATE stock = 1   ← two orders, stock once   │
//! │                                                                         │
//! │  Compare-and-set (what we do):                                         │
//! │    UPDATE catalog_items SET stock = stock - ?qty                       │
//! │     WHERE id = ?id AND stock >= ?qty                                   │
//! │    rows_affected = 1 → decremented                                     │
//! │    rows_affected = 0 → someone got there first                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::CatalogItem;

const ITEM_COLUMNS: &str = r#"
    id, name, description, category,
    price_cents, discount_percent, stock, is_active,
    created_at, updated_at
"#;

/// Repository for catalog item database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a new item.
    pub async fn insert(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting catalog item");

        sqlx::query(
            r#"
            INSERT INTO catalog_items (
                id, name, description, category,
                price_cents, discount_percent, stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.price_cents)
        .bind(item.discount_percent)
        .bind(item.stock)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an item by ID, including soft-deleted ones.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let item = sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an item only if it is active.
    pub async fn get_active(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        Ok(self.get_by_id(id).await?.filter(|item| item.is_active))
    }

    /// Lists active items, optionally filtered by category, ordered by name.
    pub async fn list_active(&self, category: Option<&str>, limit: u32) -> DbResult<Vec<CatalogItem>> {
        debug!(category = ?category, limit = %limit, "Listing catalog items");

        let items = match category {
            Some(category) => {
                sqlx::query_as::<_, CatalogItem>(&format!(
                    r#"
                    SELECT {ITEM_COLUMNS} FROM catalog_items
                    WHERE is_active = 1 AND category = ?1
                    ORDER BY name
                    LIMIT ?2
                    "#
                ))
                .bind(category)
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CatalogItem>(&format!(
                    r#"
                    SELECT {ITEM_COLUMNS} FROM catalog_items
                    WHERE is_active = 1
                    ORDER BY name
                    LIMIT ?1
                    "#
                ))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(items)
    }

    /// Persists every editable field of `item`.
    pub async fn update(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(id = %item.id, "Updating catalog item");

        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET
                name = ?2,
                description = ?3,
                category = ?4,
                price_cents = ?5,
                discount_percent = ?6,
                stock = ?7,
                updated_at = ?8
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.price_cents)
        .bind(item.discount_percent)
        .bind(item.stock)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", &item.id));
        }

        Ok(())
    }

    /// Soft-deletes an item. Existing orders keep their snapshots.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting catalog item");

        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET is_active = 0, updated_at = ?2
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Adds `delta` units to an active item's stock and returns the item.
    pub async fn restock(&self, id: &str, delta: i64) -> DbResult<CatalogItem> {
        debug!(id = %id, delta = %delta, "Restocking catalog item");

        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================

    /// Reads an item on the given connection (inside a transaction).
    pub async fn fetch_on(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CatalogItem>> {
        let item = sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    /// Decrements stock by `qty` only if at least `qty` units remain.
    ///
    /// Returns `false` when the guard failed; stock is untouched then.
    pub async fn try_decrement_stock(conn: &mut SqliteConnection, id: &str, qty: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE catalog_items SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Tests
// =============================================================================
