//! Notification entity model and DTOs.

use orderflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Notification kinds stored in `notifications.kind`.
pub mod kinds {
    pub const PRODUCT_ROUTED: &str = "product_routed";
    pub const SAMPLE_ROUTED: &str = "sample_routed";
    pub const CLIENT_REQUEST: &str = "client_request";
    pub const ORDER_STATUS: &str = "order_status";
    pub const ORDER_ASSIGNED: &str = "order_assigned";
    pub const NOTE_ADDED: &str = "note_added";
}

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub order_id: Option<DbId>,
    pub product_id: Option<DbId>,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: DbId,
    pub order_id: Option<DbId>,
    pub product_id: Option<DbId>,
    pub kind: String,
    pub message: String,
}
