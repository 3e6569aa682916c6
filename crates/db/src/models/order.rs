//! Order entity model and DTOs.
//!
//! The order row also carries the order's sample: a sample is routed exactly
//! like a product, but its holder, status and lock live in `sample_*`
//! columns.

use chrono::NaiveDate;
use orderflow_core::error::CoreError;
use orderflow_core::orders::{can_view_order, OrderStatus};
use orderflow_core::roles::Role;
use orderflow_core::routing::RoutingState;
use orderflow_core::types::{Cents, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub order_number: String,
    pub name: String,
    pub description: Option<String>,
    pub client_id: DbId,
    pub manufacturer_id: Option<DbId>,
    pub status: String,
    pub is_client_request: bool,
    pub created_by: DbId,
    pub sample_required: bool,
    pub sample_status: String,
    pub sample_routed_to: String,
    pub sample_locked: bool,
    /// Client-facing price; hidden from manufacturers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_fee_cents: Option<Cents>,
    pub sample_notes: Option<String>,
    pub sample_eta: Option<NaiveDate>,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn status(&self) -> Result<OrderStatus, CoreError> {
        OrderStatus::parse(&self.status)
    }

    pub fn sample_state(&self) -> Result<RoutingState, CoreError> {
        RoutingState::from_columns(&self.sample_routed_to, &self.sample_status, self.sample_locked)
    }

    pub fn visible_to(&self, role: Role, user_id: DbId) -> bool {
        can_view_order(role, user_id, self.client_id, self.manufacturer_id)
    }

    /// Drop the fields `role` may not see.
    pub fn redacted_for(mut self, role: Role) -> Self {
        if role == Role::Manufacturer {
            self.sample_fee_cents = None;
        }
        self
    }
}

/// DTO for creating an order. The order number is assigned on insert.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub name: String,
    pub description: Option<String>,
    pub client_id: DbId,
    pub manufacturer_id: Option<DbId>,
    pub is_client_request: bool,
    pub created_by: DbId,
    pub sample_required: bool,
}

/// DTO for updating an order's descriptive fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrder {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// DTO for the admin-managed sample fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateSample {
    pub sample_required: Option<bool>,
    pub sample_fee_cents: Option<Cents>,
    pub sample_notes: Option<String>,
    pub sample_eta: Option<NaiveDate>,
}

/// Which orders a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Client(DbId),
    Manufacturer(DbId),
}

impl OrderScope {
    pub fn for_user(role: Role, user_id: DbId) -> Self {
        match role {
            Role::Admin => OrderScope::All,
            Role::Client => OrderScope::Client(user_id),
            Role::Manufacturer => OrderScope::Manufacturer(user_id),
        }
    }

    /// `(client_id, manufacturer_id)` filter values; `None` means unfiltered.
    pub fn filters(self) -> (Option<DbId>, Option<DbId>) {
        match self {
            OrderScope::All => (None, None),
            OrderScope::Client(id) => (Some(id), None),
            OrderScope::Manufacturer(id) => (None, Some(id)),
        }
    }
}
