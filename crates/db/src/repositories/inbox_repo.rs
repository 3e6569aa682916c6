//! Cross-table query for the "routed to me" inbox.

use orderflow_core::roles::Role;
use sqlx::PgPool;

use crate::models::inbox::InboxEntry;
use crate::models::order::OrderScope;

pub struct InboxRepo;

impl InboxRepo {
    /// Products and required samples currently held by `holder`, restricted
    /// to orders in `scope`. Completed products and cancelled orders are
    /// excluded. Most recently touched first.
    pub async fn list(
        pool: &PgPool,
        holder: Role,
        scope: OrderScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<InboxEntry>, sqlx::Error> {
        let (client_id, manufacturer_id) = scope.filters();
        sqlx::query_as::<_, InboxEntry>(
            "SELECT * FROM (
                SELECT 'product' AS entity, p.id AS item_id, o.id AS order_id,
                       o.order_number, o.name AS order_name, p.name AS item_name,
                       p.product_status AS status, p.is_locked, p.version, p.updated_at
                FROM order_products p
                JOIN orders o ON o.id = p.order_id
                WHERE p.routed_to = $1
                  AND p.product_status <> 'completed'
                  AND o.status <> 'cancelled'
                  AND ($2::BIGINT IS NULL OR o.client_id = $2)
                  AND ($3::BIGINT IS NULL OR o.manufacturer_id = $3)
                UNION ALL
                SELECT 'sample', o.id, o.id,
                       o.order_number, o.name, o.name,
                       o.sample_status, o.sample_locked, o.version, o.updated_at
                FROM orders o
                WHERE o.sample_required
                  AND o.sample_routed_to = $1
                  AND o.status <> 'cancelled'
                  AND ($2::BIGINT IS NULL OR o.client_id = $2)
                  AND ($3::BIGINT IS NULL OR o.manufacturer_id = $3)
             ) inbox
             ORDER BY updated_at DESC, item_id DESC
             LIMIT $4 OFFSET $5",
        )
        .bind(holder.as_str())
        .bind(client_id)
        .bind(manufacturer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
