//! Order media model and DTOs.

use orderflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `order_media`. The file itself lives under the media root at
/// `stored_path`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderMedia {
    pub id: DbId,
    pub order_id: DbId,
    pub product_id: Option<DbId>,
    pub media_kind: String,
    pub original_name: String,
    #[serde(skip_serializing)]
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: DbId,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateMedia {
    pub order_id: DbId,
    pub product_id: Option<DbId>,
    pub media_kind: String,
    pub original_name: String,
    pub stored_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: DbId,
}
