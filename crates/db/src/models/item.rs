//! Order item (variant line) model and DTOs.

use orderflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `order_items`: one variant combination of a product.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: DbId,
    pub product_id: DbId,
    pub variant: String,
    pub quantity: i32,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateItem {
    pub product_id: DbId,
    pub variant: String,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    pub variant: Option<String>,
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}
