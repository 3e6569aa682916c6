//! Route definitions for the `/admin` resource.
//!
//! All endpoints require the `admin` role.

use axum::routing::get;
use axum::Router;

use crate::handlers::{admin, audit};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /users                         -> list_users (?role=)
/// POST   /users                         -> create_user
///
/// GET    /audit-logs                    -> query_audit_logs
/// GET    /audit-logs/integrity-check    -> check_integrity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/audit-logs", get(audit::query_audit_logs))
        .route("/audit-logs/integrity-check", get(audit::check_integrity))
}
