use axum::extract::{Query, State};
use axum::Json;
use orderflow_db::models::inbox::InboxEntry;
use orderflow_db::models::order::OrderScope;
use orderflow_db::repositories::InboxRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/inbox
///
/// Products and samples currently routed to the caller's role, limited to
/// orders the caller can see. Most recently changed first.
pub async fn list_inbox(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<InboxEntry>>>> {
    let (limit, offset) = params.resolve();
    let scope = OrderScope::for_user(user.role, user.user_id);
    let data = InboxRepo::list(&state.pool, user.role, scope, limit, offset).await?;
    Ok(Json(DataResponse { data }))
}
