use orderflow_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A refresh-token session. The token itself is never stored, only its
/// SHA-256 hash, so the hash is not carried on the model.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    /// `User-Agent` of the login or refresh that opened the session.
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
}
