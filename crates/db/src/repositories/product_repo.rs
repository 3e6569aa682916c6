//! Repository for the `order_products` table.

use orderflow_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::product::{CreateProduct, OrderProduct, UpdatePricing, UpdateProduct};

/// Column list for `order_products` SELECT / RETURNING clauses.
pub(crate) const COLUMNS: &str = "\
    id, order_id, name, description, routed_to, product_status, is_locked, \
    manufacturer_unit_cost_cents, client_unit_price_cents, manufacturer_shipping_cents, \
    client_shipping_cents, production_eta, tracking_number, version, created_at, updated_at";

pub struct ProductRepo;

impl ProductRepo {
    /// Insert a product. New products start pending, held by the admin.
    pub async fn create(pool: &PgPool, input: &CreateProduct) -> Result<OrderProduct, sqlx::Error> {
        let query = format!(
            "INSERT INTO order_products (order_id, name, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderProduct>(&query)
            .bind(input.order_id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<OrderProduct>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_products WHERE id = $1");
        sqlx::query_as::<_, OrderProduct>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<OrderProduct>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_products WHERE order_id = $1 ORDER BY id");
        sqlx::query_as::<_, OrderProduct>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// Statuses of every product in an order.
    pub async fn stages_for_order<'e>(
        executor: impl PgExecutor<'e>,
        order_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT product_status FROM order_products WHERE order_id = $1")
            .bind(order_id)
            .fetch_all(executor)
            .await
    }

    /// Update descriptive and fulfilment fields. Only non-`None` fields are
    /// applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProduct,
    ) -> Result<Option<OrderProduct>, sqlx::Error> {
        let query = format!(
            "UPDATE order_products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                production_eta = COALESCE($4, production_eta),
                tracking_number = COALESCE($5, tracking_number),
                version = version + 1,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderProduct>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.production_eta)
            .bind(&input.tracking_number)
            .fetch_optional(pool)
            .await
    }

    /// Update price fields on an unlocked product.
    ///
    /// Returns `None` when the product does not exist or is locked; the lock
    /// is re-checked here so a concurrent approval cannot be overwritten.
    pub async fn update_pricing(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePricing,
    ) -> Result<Option<OrderProduct>, sqlx::Error> {
        let query = format!(
            "UPDATE order_products SET
                manufacturer_unit_cost_cents = COALESCE($2, manufacturer_unit_cost_cents),
                client_unit_price_cents = COALESCE($3, client_unit_price_cents),
                manufacturer_shipping_cents = COALESCE($4, manufacturer_shipping_cents),
                client_shipping_cents = COALESCE($5, client_shipping_cents),
                version = version + 1,
                updated_at = NOW()
             WHERE id = $1 AND is_locked = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderProduct>(&query)
            .bind(id)
            .bind(input.manufacturer_unit_cost_cents)
            .bind(input.client_unit_price_cents)
            .bind(input.manufacturer_shipping_cents)
            .bind(input.client_shipping_cents)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM order_products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
