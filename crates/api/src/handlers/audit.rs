//! Handlers for the audit trail.
//!
//! All endpoints require admin role.

use axum::extract::{Query, State};
use axum::Json;
use orderflow_core::audit::{verify_chain, ChainLink, ChainVerification};
use orderflow_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use orderflow_db::models::audit::{AuditLogPage, AuditQuery};
use orderflow_db::repositories::AuditLogRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/audit-logs
///
/// Filter by `user_id`, `action_type`, `entity_type` or `order_id`; newest
/// first.
pub async fn query_audit_logs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<AuditLogPage>>> {
    let limit = clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let offset = clamp_offset(params.offset);

    let items = AuditLogRepo::query(&state.pool, &params, limit, offset).await?;
    let total = AuditLogRepo::count(&state.pool, &params).await?;

    Ok(Json(DataResponse {
        data: AuditLogPage { items, total },
    }))
}

/// GET /api/v1/admin/audit-logs/integrity-check
///
/// Recompute the hash chain from the seed and report the first entry whose
/// stored hash does not match.
pub async fn check_integrity(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<DataResponse<ChainVerification>>> {
    let links: Vec<ChainLink> = AuditLogRepo::fetch_chain(&state.pool)
        .await?
        .into_iter()
        .map(|log| ChainLink {
            id: log.id,
            entry_data: log.canonical_data(),
            integrity_hash: log.integrity_hash,
        })
        .collect();

    let result = verify_chain(&links);
    if result.valid {
        tracing::info!(user_id = admin.user_id, entries = result.entries_checked, "Audit chain verified");
    } else {
        tracing::warn!(
            user_id = admin.user_id,
            first_broken_id = ?result.first_broken_id,
            "Audit chain integrity check failed"
        );
    }
    Ok(Json(DataResponse { data: result }))
}
