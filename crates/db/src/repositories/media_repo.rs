//! Repository for the `order_media` table.

use orderflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::media::{CreateMedia, OrderMedia};

const COLUMNS: &str = "id, order_id, product_id, media_kind, original_name, stored_path, \
                       content_type, size_bytes, uploaded_by, created_at";

pub struct MediaRepo;

impl MediaRepo {
    pub async fn create(pool: &PgPool, input: &CreateMedia) -> Result<OrderMedia, sqlx::Error> {
        let query = format!(
            "INSERT INTO order_media (order_id, product_id, media_kind, original_name, \
                                      stored_path, content_type, size_bytes, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderMedia>(&query)
            .bind(input.order_id)
            .bind(input.product_id)
            .bind(&input.media_kind)
            .bind(&input.original_name)
            .bind(&input.stored_path)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OrderMedia>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_media WHERE id = $1");
        sqlx::query_as::<_, OrderMedia>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Media for an order, optionally narrowed to one product.
    pub async fn list_by_order(
        pool: &PgPool,
        order_id: DbId,
        product_id: Option<DbId>,
    ) -> Result<Vec<OrderMedia>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM order_media
             WHERE order_id = $1 AND ($2::BIGINT IS NULL OR product_id = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, OrderMedia>(&query)
            .bind(order_id)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }

    /// Delete the row and return it so the caller can remove the file.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<OrderMedia>, sqlx::Error> {
        let query = format!("DELETE FROM order_media WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, OrderMedia>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
