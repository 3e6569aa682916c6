//! Repository for the `orders` table.

use chrono::{Datelike, Utc};
use orderflow_core::error::CoreError;
use orderflow_core::orders::{
    check_editable, check_manufacturer_change, check_sample_fee, check_sample_requirement,
    format_order_number, OrderStatus,
};
use orderflow_core::roles::ROLE_MANUFACTURER;
use orderflow_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::order::{CreateOrder, Order, OrderScope, UpdateOrder, UpdateSample};
use crate::repositories::TransitionError;

/// Column list for `orders` SELECT / RETURNING clauses.
pub(crate) const COLUMNS: &str = "\
    id, order_number, name, description, client_id, manufacturer_id, status, \
    is_client_request, created_by, sample_required, sample_status, sample_routed_to, \
    sample_locked, sample_fee_cents, sample_notes, sample_eta, version, created_at, updated_at";

/// Scope and status filter shared by `list` and `count`. Binds `$1` (client),
/// `$2` (manufacturer) and `$3` (status).
const FILTER: &str = "\
    WHERE ($1::BIGINT IS NULL OR client_id = $1) \
      AND ($2::BIGINT IS NULL OR manufacturer_id = $2) \
      AND ($3::TEXT IS NULL OR status = $3)";

pub struct OrderRepo;

impl OrderRepo {
    /// Insert an order with the next `ORD-<year>-<seq>` number.
    pub async fn create(pool: &PgPool, input: &CreateOrder) -> Result<Order, sqlx::Error> {
        let seq: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
            .fetch_one(pool)
            .await?;
        let order_number = format_order_number(Utc::now().year(), seq);
        let status = OrderStatus::initial(input.is_client_request);

        let query = format!(
            "INSERT INTO orders (order_number, name, description, client_id, manufacturer_id, \
                                 status, is_client_request, created_by, sample_required)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(&order_number)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.client_id)
            .bind(input.manufacturer_id)
            .bind(status.as_str())
            .bind(input.is_client_request)
            .bind(input.created_by)
            .bind(input.sample_required)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List orders visible under `scope`, newest first.
    pub async fn list(
        pool: &PgPool,
        scope: OrderScope,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let (client_id, manufacturer_id) = scope.filters();
        let query = format!(
            "SELECT {COLUMNS} FROM orders {FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(client_id)
            .bind(manufacturer_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        scope: OrderScope,
        status: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let (client_id, manufacturer_id) = scope.filters();
        let query = format!("SELECT COUNT(*)::BIGINT FROM orders {FILTER}");
        sqlx::query_scalar(&query)
            .bind(client_id)
            .bind(manufacturer_id)
            .bind(status)
            .fetch_one(pool)
            .await
    }

    /// Update descriptive fields. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateOrder,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                version = version + 1,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Update the admin-managed sample fields.
    ///
    /// Runs under the order's row lock so the fee and requirement checks see
    /// the same sample state the write lands on.
    pub async fn update_sample(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSample,
    ) -> Result<Order, TransitionError> {
        let mut tx = pool.begin().await?;
        let order = lock_order(&mut tx, id)
            .await?
            .ok_or(CoreError::not_found("Order", id))?;
        check_editable(order.status()?)?;
        check_sample_fee(order.sample_locked, order.sample_fee_cents, input.sample_fee_cents)?;
        check_sample_requirement(
            order.sample_required,
            input.sample_required,
            order.sample_state()?.holder,
        )?;

        let query = format!(
            "UPDATE orders SET
                sample_required = COALESCE($2, sample_required),
                sample_fee_cents = COALESCE($3, sample_fee_cents),
                sample_notes = COALESCE($4, sample_notes),
                sample_eta = COALESCE($5, sample_eta),
                version = version + 1,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(input.sample_required)
            .bind(input.sample_fee_cents)
            .bind(&input.sample_notes)
            .bind(input.sample_eta)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Move the order from `from` to `to`. `None` when the order is missing
    /// or no longer in `from`.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET status = $2, version = version + 1, updated_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(to.as_str())
            .bind(from.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Assign (or clear, with `None`) the order's manufacturer.
    ///
    /// Refused while the current manufacturer holds any product or the
    /// sample. Routing transitions take the same order lock, so nothing can
    /// be routed to the manufacturer between the count and the write.
    pub async fn assign_manufacturer(
        pool: &PgPool,
        id: DbId,
        manufacturer_id: Option<DbId>,
    ) -> Result<Order, TransitionError> {
        let mut tx = pool.begin().await?;
        let order = lock_order(&mut tx, id)
            .await?
            .ok_or(CoreError::not_found("Order", id))?;
        check_editable(order.status()?)?;

        let products_held: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM order_products WHERE order_id = $1 AND routed_to = $2",
        )
        .bind(id)
        .bind(ROLE_MANUFACTURER)
        .fetch_one(&mut *tx)
        .await?;
        let sample_held = order.sample_required && order.sample_routed_to == ROLE_MANUFACTURER;
        check_manufacturer_change(
            order.manufacturer_id,
            manufacturer_id,
            products_held + i64::from(sample_held),
        )?;

        let query = format!(
            "UPDATE orders SET manufacturer_id = $2, version = version + 1, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(manufacturer_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Delete an order and, by cascade, everything attached to it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// `SELECT ... FOR UPDATE` on one order row.
pub(crate) async fn lock_order(
    conn: &mut PgConnection,
    id: DbId,
) -> Result<Option<Order>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Order>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}
