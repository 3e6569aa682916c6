//! Repository for the `audit_logs` table.
//!
//! Appends serialize on a transaction-scoped advisory lock so two writers can
//! never chain onto the same previous hash.

use orderflow_core::audit::{
    canonical_entry_data, compute_integrity_hash, redact_sensitive_fields,
};
use orderflow_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::audit::{AuditLog, AuditQuery, NewAuditEntry};

const COLUMNS: &str = "\
    id, timestamp, user_id, action_type, entity_type, entity_id, order_id, \
    details_json, integrity_hash";

/// Advisory lock key guarding the hash chain.
const CHAIN_LOCK_KEY: i64 = 0x0A0D_17C4_A1A0;

/// Filter shared by `query` and `count`; binds `$1`..`$4`.
const FILTER: &str = "\
    WHERE ($1::BIGINT IS NULL OR user_id = $1) \
      AND ($2::TEXT IS NULL OR action_type = $2) \
      AND ($3::TEXT IS NULL OR entity_type = $3) \
      AND ($4::BIGINT IS NULL OR order_id = $4)";

pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append an entry inside the caller's transaction.
    ///
    /// Sensitive keys in `details` are redacted before hashing and storage.
    pub async fn append(
        conn: &mut PgConnection,
        entry: &NewAuditEntry,
    ) -> Result<AuditLog, sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHAIN_LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        let prev_hash: Option<String> =
            sqlx::query_scalar("SELECT integrity_hash FROM audit_logs ORDER BY id DESC LIMIT 1")
                .fetch_optional(&mut *conn)
                .await?;

        let details = redact_sensitive_fields(&entry.details);
        let data = canonical_entry_data(
            &entry.action_type,
            &entry.entity_type,
            entry.entity_id,
            entry.user_id,
            &details,
        );
        let hash = compute_integrity_hash(prev_hash.as_deref(), &data);

        let query = format!(
            "INSERT INTO audit_logs \
                (user_id, action_type, entity_type, entity_id, order_id, details_json, integrity_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(entry.user_id)
            .bind(&entry.action_type)
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(entry.order_id)
            .bind(&details)
            .bind(&hash)
            .fetch_one(&mut *conn)
            .await
    }

    /// Append an entry in its own transaction.
    pub async fn record(pool: &PgPool, entry: &NewAuditEntry) -> Result<AuditLog, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let log = Self::append(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(log)
    }

    /// Query audit logs with filtering and pagination, newest first.
    pub async fn query(
        pool: &PgPool,
        params: &AuditQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {FILTER}
             ORDER BY id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(params.user_id)
            .bind(&params.action_type)
            .bind(&params.entity_type)
            .bind(params.order_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &AuditQuery) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*)::BIGINT FROM audit_logs {FILTER}");
        sqlx::query_scalar(&query)
            .bind(params.user_id)
            .bind(&params.action_type)
            .bind(&params.entity_type)
            .bind(params.order_id)
            .fetch_one(pool)
            .await
    }

    /// Every entry for one order, oldest first.
    pub async fn list_for_order(pool: &PgPool, order_id: DbId) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audit_logs WHERE order_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// The whole chain in insertion order, for integrity verification.
    pub async fn fetch_chain(pool: &PgPool) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audit_logs ORDER BY id ASC");
        sqlx::query_as::<_, AuditLog>(&query).fetch_all(pool).await
    }
}
