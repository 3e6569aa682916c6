//! Repository for the `client_admin_notes` table.

use orderflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::note::{ClientAdminNote, CreateNote};

const COLUMNS: &str = "id, order_id, product_id, author_id, author_role, body, created_at";

pub struct NoteRepo;

impl NoteRepo {
    pub async fn create(pool: &PgPool, input: &CreateNote) -> Result<ClientAdminNote, sqlx::Error> {
        let query = format!(
            "INSERT INTO client_admin_notes (order_id, product_id, author_id, author_role, body)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClientAdminNote>(&query)
            .bind(input.order_id)
            .bind(input.product_id)
            .bind(input.author_id)
            .bind(&input.author_role)
            .bind(&input.body)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ClientAdminNote>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM client_admin_notes WHERE id = $1");
        sqlx::query_as::<_, ClientAdminNote>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The order's thread in posting order.
    pub async fn list_by_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<ClientAdminNote>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM client_admin_notes WHERE order_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ClientAdminNote>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM client_admin_notes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
