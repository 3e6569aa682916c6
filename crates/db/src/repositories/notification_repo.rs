//! Repository for the `notifications` table.

use orderflow_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::notification::{NewNotification, Notification};

const COLUMNS: &str =
    "id, user_id, order_id, product_id, kind, message, is_read, read_at, created_at";

pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert notifications inside the caller's transaction.
    pub async fn insert_many(
        conn: &mut PgConnection,
        items: &[NewNotification],
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (user_id, order_id, product_id, kind, message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let mut created = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, Notification>(&query)
                .bind(item.user_id)
                .bind(item.order_id)
                .bind(item.product_id)
                .bind(&item.kind)
                .bind(&item.message)
                .fetch_one(&mut *conn)
                .await?;
            created.push(row);
        }
        Ok(created)
    }

    /// Insert notifications in their own transaction.
    pub async fn create_many(
        pool: &PgPool,
        items: &[NewNotification],
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let created = Self::insert_many(&mut tx, items).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// List notifications for a user, newest first.
    ///
    /// When `unread_only` is `true`, only unread notifications are returned.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only { "AND is_read = false" } else { "" };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 {filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark one of the user's notifications as read.
    ///
    /// Returns `false` if it does not belong to the user or was already read.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND is_read = false",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns the number of notifications marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
