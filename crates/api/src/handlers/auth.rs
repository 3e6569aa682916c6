//! Login, refresh-token rotation and logout.
//!
//! Access tokens are short-lived JWTs; each refresh token maps to one row in
//! `user_sessions` and is single use.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::roles::Role;
use orderflow_core::types::DbId;
use orderflow_db::models::audit::NewAuditEntry;
use orderflow_db::models::session::NewSession;
use orderflow_db::models::user::User;
use orderflow_db::repositories::{AuditLogRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Consecutive failed logins that lock an account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i64 = 15;

/// Longest `User-Agent` kept on a session.
const MAX_USER_AGENT_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.to_string()))
}

/// Deactivated and locked accounts may not sign in or refresh.
fn ensure_may_sign_in(user: &User) -> AppResult<()> {
    if !user.is_active {
        return Err(CoreError::Forbidden("Account is deactivated".into()).into());
    }
    if user.is_locked_at(Utc::now()) {
        return Err(CoreError::Forbidden(
            "Account is temporarily locked after repeated failed logins".into(),
        )
        .into());
    }
    Ok(())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect())
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_username(&state.pool, input.username.trim())
        .await?
        .ok_or_else(|| unauthorized("Invalid username or password"))?;
    ensure_may_sign_in(&user)?;

    let password_ok = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_ok {
        let lock_until = Utc::now() + Duration::minutes(LOCK_DURATION_MINS);
        let failures =
            UserRepo::record_failed_login(&state.pool, user.id, MAX_FAILED_ATTEMPTS, lock_until)
                .await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
        }
        return Err(unauthorized("Invalid username or password"));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(user.id, action_types::LOGIN, entity_types::USER, user.id),
    )
    .await?;

    let (refresh_token, refresh_hash) = generate_refresh_token();
    SessionRepo::create(&state.pool, &new_session(&state, &user, refresh_hash, &headers)).await?;

    let response = auth_response(&state, &user, refresh_token)?;
    tracing::info!(user_id = user.id, role = %response.user.role, "User logged in");
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Trade a refresh token for a new pair. The presented token stops working
/// whether or not the exchange succeeds.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = SessionRepo::find_live(&state.pool, &hash_refresh_token(&input.refresh_token))
        .await?
        .ok_or_else(|| unauthorized("Invalid or expired refresh token"))?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| unauthorized("User no longer exists"))?;
    ensure_may_sign_in(&user)?;

    let (refresh_token, refresh_hash) = generate_refresh_token();
    let rotated = SessionRepo::rotate(
        &state.pool,
        session.id,
        &new_session(&state, &user, refresh_hash, &headers),
    )
    .await?;
    if rotated.is_none() {
        tracing::warn!(user_id = user.id, session_id = session.id, "Refresh token reused");
        return Err(unauthorized("Invalid or expired refresh token"));
    }

    Ok(Json(auth_response(&state, &user, refresh_token)?))
}

/// POST /api/v1/auth/logout
///
/// Ends every session of the caller. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.user_id).await?;
    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(user.user_id, action_types::LOGOUT, entity_types::USER, user.user_id)
            .details(serde_json::json!({ "sessions_revoked": revoked })),
    )
    .await?;
    tracing::info!(user_id = user.user_id, revoked, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

fn new_session(
    state: &AppState,
    user: &User,
    refresh_token_hash: String,
    headers: &HeaderMap,
) -> NewSession {
    NewSession {
        user_id: user.id,
        refresh_token_hash,
        expires_at: Utc::now() + Duration::days(state.config.jwt.refresh_token_expiry_days),
        user_agent: user_agent(headers),
    }
}

fn auth_response(state: &AppState, user: &User, refresh_token: String) -> AppResult<AuthResponse> {
    let role = user.role()?;
    let access_token = generate_access_token(user.id, role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserInfo {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role,
        },
    })
}
