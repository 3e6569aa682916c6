//! Order accessory model and DTOs.

use orderflow_core::error::CoreError;
use orderflow_core::pricing::{accessory_totals, Totals};
use orderflow_core::roles::Role;
use orderflow_core::types::{Cents, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `order_accessories` (labels, packaging, hang tags...).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderAccessory {
    pub id: DbId,
    pub order_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_cost_cents: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_unit_price_cents: Option<Cents>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OrderAccessory {
    pub fn totals(&self) -> Result<Totals, CoreError> {
        accessory_totals(
            self.unit_cost_cents.unwrap_or(0),
            self.client_unit_price_cents.unwrap_or(0),
            i64::from(self.quantity),
        )
    }

    pub fn redacted_for(mut self, role: Role) -> Self {
        match role {
            Role::Admin => {}
            Role::Manufacturer => self.client_unit_price_cents = None,
            Role::Client => self.unit_cost_cents = None,
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateAccessory {
    pub order_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_cost_cents: Option<Cents>,
    pub client_unit_price_cents: Option<Cents>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAccessory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit_cost_cents: Option<Cents>,
    pub client_unit_price_cents: Option<Cents>,
}
