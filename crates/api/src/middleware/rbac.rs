//! Role-gated extractors. Each wraps [`AuthUser`] and answers 403 when the
//! caller's role is not in its list, so the requirement reads off the
//! handler signature:
//!
//! ```ignore
//! async fn create_user(RequireAdmin(admin): RequireAdmin) -> AppResult<StatusCode> { .. }
//! ```

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use orderflow_core::error::CoreError;
use orderflow_core::roles::Role;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn authorize(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[Role],
    denial: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !allowed.contains(&user.role) {
        return Err(CoreError::Forbidden(denial.to_string()).into());
    }
    Ok(user)
}

pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        authorize(parts, state, &[Role::Admin], "Admin role required")
            .await
            .map(RequireAdmin)
    }
}

/// The roles that open orders and products and share the note thread.
pub struct RequireAdminOrClient(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdminOrClient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        authorize(
            parts,
            state,
            &[Role::Admin, Role::Client],
            "Admin or client role required",
        )
        .await
        .map(RequireAdminOrClient)
    }
}
