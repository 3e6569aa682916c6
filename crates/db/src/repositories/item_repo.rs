//! Repository for the `order_items` table.

use orderflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::item::{CreateItem, OrderItem, UpdateItem};

const COLUMNS: &str = "id, product_id, variant, quantity, notes, created_at, updated_at";

/// Matches only items whose product is unlocked, share-locking the product
/// row for the rest of the statement.
const UNLOCKED_PRODUCT: &str = "\
    AND EXISTS (SELECT 1 FROM order_products p \
                WHERE p.id = order_items.product_id AND NOT p.is_locked \
                FOR SHARE OF p)";

pub struct ItemRepo;

impl ItemRepo {
    /// Insert an item. `None` when the product is missing or locked.
    pub async fn create(
        pool: &PgPool,
        input: &CreateItem,
    ) -> Result<Option<OrderItem>, sqlx::Error> {
        let query = format!(
            "INSERT INTO order_items (product_id, variant, quantity, notes)
             SELECT p.id, $2::TEXT, $3::INTEGER, $4::TEXT
             FROM order_products p
             WHERE p.id = $1 AND NOT p.is_locked
             FOR SHARE OF p
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(input.product_id)
            .bind(&input.variant)
            .bind(input.quantity)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OrderItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_items WHERE id = $1");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_product(
        pool: &PgPool,
        product_id: DbId,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_items WHERE product_id = $1 ORDER BY id");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }

    /// `(product_id, quantity)` for every item of an order, for totals.
    pub async fn quantities_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<(DbId, i32)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT i.product_id, i.quantity FROM order_items i
             JOIN order_products p ON p.id = i.product_id
             WHERE p.order_id = $1",
        )
        .bind(order_id)
        .fetch_all(pool)
        .await
    }

    /// Update an item. `None` when the item is missing or its product is
    /// locked.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateItem,
    ) -> Result<Option<OrderItem>, sqlx::Error> {
        let query = format!(
            "UPDATE order_items SET
                variant = COALESCE($2, variant),
                quantity = COALESCE($3, quantity),
                notes = COALESCE($4, notes),
                updated_at = NOW()
             WHERE id = $1 {UNLOCKED_PRODUCT}
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(id)
            .bind(&input.variant)
            .bind(input.quantity)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Delete an item. `false` when the item is missing or its product is
    /// locked.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM order_items WHERE id = $1 {UNLOCKED_PRODUCT}");
        let result = sqlx::query(&query)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
