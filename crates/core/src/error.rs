//! Domain errors shared by every crate.
//!
//! The API maps each variant to one HTTP status: `NotFound` 404,
//! `Validation` 400, `Conflict` 409, `Unauthorized` 401, `Forbidden` 403 and
//! `Internal` 500.

use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Missing, or hidden from the caller. Both read the same.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("invalid input: {0}")]
    Validation(String),

    /// The request is well formed but the current state forbids it: a stale
    /// version, a locked product, a closed order.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not authenticated: {0}")]
    Unauthorized(String),

    #[error("not permitted: {0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        CoreError::NotFound { entity, id }
    }
}
