//! Repository for the `order_accessories` table.

use orderflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::accessory::{CreateAccessory, OrderAccessory, UpdateAccessory};

const COLUMNS: &str = "id, order_id, name, description, quantity, unit_cost_cents, \
                       client_unit_price_cents, created_at, updated_at";

pub struct AccessoryRepo;

impl AccessoryRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateAccessory,
    ) -> Result<OrderAccessory, sqlx::Error> {
        let query = format!(
            "INSERT INTO order_accessories \
                (order_id, name, description, quantity, unit_cost_cents, client_unit_price_cents)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderAccessory>(&query)
            .bind(input.order_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.quantity)
            .bind(input.unit_cost_cents)
            .bind(input.client_unit_price_cents)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<OrderAccessory>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM order_accessories WHERE id = $1");
        sqlx::query_as::<_, OrderAccessory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<OrderAccessory>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM order_accessories WHERE order_id = $1 ORDER BY id");
        sqlx::query_as::<_, OrderAccessory>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAccessory,
    ) -> Result<Option<OrderAccessory>, sqlx::Error> {
        let query = format!(
            "UPDATE order_accessories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                quantity = COALESCE($4, quantity),
                unit_cost_cents = COALESCE($5, unit_cost_cents),
                client_unit_price_cents = COALESCE($6, client_unit_price_cents),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrderAccessory>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.quantity)
            .bind(input.unit_cost_cents)
            .bind(input.client_unit_price_cents)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM order_accessories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
