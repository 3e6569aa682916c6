//! Handlers for the `/admin/users` resource.
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::roles::Role;
use orderflow_core::validation::validate_input;
use orderflow_db::models::audit::NewAuditEntry;
use orderflow_db::models::user::{CreateUser, UserResponse};
use orderflow_db::repositories::{AuditLogRepo, UserRepo};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::password::{hash_password, validate_new_password};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "must be 3 to 50 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub password: String,
    /// `admin`, `manufacturer` or `client`.
    pub role: String,
}

/// Query parameters for `GET /admin/users`.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub role: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
///
/// List users, optionally filtered by role name.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let role_id = params
        .role
        .as_deref()
        .map(Role::parse)
        .transpose()?
        .map(Role::id);

    let users = UserRepo::list(&state.pool, role_id).await?;
    let data = users
        .iter()
        .map(UserResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/admin/users
///
/// Create a user. The password is hashed; the response never carries it.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    validate_input(&input)?;
    validate_new_password(&input.password, &input.username)?;
    let role = Role::parse(&input.role)?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            password_hash: hashed,
            role_id: role.id(),
        },
    )
    .await?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            admin.user_id,
            action_types::USER_CREATE,
            entity_types::USER,
            user.id,
        )
        .details(json!({ "username": user.username, "role": role.as_str() })),
    )
    .await?;

    tracing::info!(user_id = admin.user_id, new_user_id = user.id, role = %role, "User created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::try_from(&user)?,
        }),
    ))
}
