//! Client/admin note model and DTOs.

use orderflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `client_admin_notes`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientAdminNote {
    pub id: DbId,
    pub order_id: DbId,
    pub product_id: Option<DbId>,
    pub author_id: DbId,
    pub author_role: String,
    pub body: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateNote {
    pub order_id: DbId,
    pub product_id: Option<DbId>,
    pub author_id: DbId,
    pub author_role: String,
    pub body: String,
}
