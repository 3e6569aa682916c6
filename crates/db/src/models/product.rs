//! Order product model and DTOs.

use chrono::NaiveDate;
use orderflow_core::error::CoreError;
use orderflow_core::pricing::ProductPricing;
use orderflow_core::roles::Role;
use orderflow_core::routing::RoutingState;
use orderflow_core::types::{Cents, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `order_products` table.
///
/// Price fields are skipped when `None` so a redacted row simply omits them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderProduct {
    pub id: DbId,
    pub order_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub routed_to: String,
    pub product_status: String,
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_unit_cost_cents: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_unit_price_cents: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_shipping_cents: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_shipping_cents: Option<Cents>,
    pub production_eta: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OrderProduct {
    pub fn routing_state(&self) -> Result<RoutingState, CoreError> {
        RoutingState::from_columns(&self.routed_to, &self.product_status, self.is_locked)
    }

    pub fn pricing(&self) -> ProductPricing {
        ProductPricing {
            manufacturer_unit_cost: self.manufacturer_unit_cost_cents,
            client_unit_price: self.client_unit_price_cents,
            manufacturer_shipping: self.manufacturer_shipping_cents,
            client_shipping: self.client_shipping_cents,
        }
    }

    /// Drop the price fields `role` may not see.
    pub fn redacted_for(mut self, role: Role) -> Self {
        match role {
            Role::Admin => {}
            Role::Manufacturer => {
                self.client_unit_price_cents = None;
                self.client_shipping_cents = None;
            }
            Role::Client => {
                self.manufacturer_unit_cost_cents = None;
                self.manufacturer_shipping_cents = None;
            }
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub order_id: DbId,
    pub name: String,
    pub description: Option<String>,
}

/// Descriptive and fulfilment fields. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub production_eta: Option<NaiveDate>,
    pub tracking_number: Option<String>,
}

/// Price fields. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdatePricing {
    pub manufacturer_unit_cost_cents: Option<Cents>,
    pub client_unit_price_cents: Option<Cents>,
    pub manufacturer_shipping_cents: Option<Cents>,
    pub client_shipping_cents: Option<Cents>,
}

impl UpdatePricing {
    pub fn is_empty(&self) -> bool {
        self.manufacturer_unit_cost_cents.is_none()
            && self.client_unit_price_cents.is_none()
            && self.manufacturer_shipping_cents.is_none()
            && self.client_shipping_cents.is_none()
    }

    /// Whether any client-facing field is being set.
    pub fn touches_client_prices(&self) -> bool {
        self.client_unit_price_cents.is_some() || self.client_shipping_cents.is_some()
    }
}
