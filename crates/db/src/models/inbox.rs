//! Inbox rows: products and samples currently routed to a role.

use orderflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InboxEntry {
    /// `product` or `sample`.
    pub entity: String,
    /// Product id, or the order id for a sample.
    pub item_id: DbId,
    pub order_id: DbId,
    pub order_number: String,
    pub order_name: String,
    pub item_name: String,
    pub status: String,
    pub is_locked: bool,
    pub version: i32,
    pub updated_at: Timestamp,
}
