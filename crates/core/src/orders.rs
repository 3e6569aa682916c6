//! Order lifecycle rules, order numbers and visibility.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;
use crate::routing::{RouteAction, Stage};
use crate::types::{Cents, DbId};

pub const MAX_ORDER_NAME_LENGTH: usize = 200;
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Submitted,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Draft,
        OrderStatus::Submitted,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Submitted => "submitted",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        OrderStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid order status '{value}'. Must be one of: draft, submitted, \
                     in_progress, completed, cancelled"
                ))
            })
    }

    /// Completed and cancelled orders accept no further edits.
    pub fn is_closed(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Status a new order starts in.
    pub fn initial(is_client_request: bool) -> Self {
        if is_client_request {
            OrderStatus::Submitted
        } else {
            OrderStatus::Draft
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lifecycle checks
// ---------------------------------------------------------------------------

pub fn check_submit(status: OrderStatus) -> Result<(), CoreError> {
    if status == OrderStatus::Draft {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Only draft orders can be submitted (current: {status})"
        )))
    }
}

pub fn check_cancel(status: OrderStatus) -> Result<(), CoreError> {
    if status.is_closed() {
        Err(CoreError::Conflict(format!("Order is already {status}")))
    } else {
        Ok(())
    }
}

/// Reject edits to a closed order or anything inside it.
pub fn check_editable(status: OrderStatus) -> Result<(), CoreError> {
    if status.is_closed() {
        Err(CoreError::Conflict(format!(
            "Order is {status} and can no longer be modified"
        )))
    } else {
        Ok(())
    }
}

/// Routing to the manufacturer needs an assigned manufacturer.
pub fn check_manufacturer_assigned(
    action: RouteAction,
    manufacturer_id: Option<DbId>,
) -> Result<(), CoreError> {
    if action == RouteAction::Route(Role::Manufacturer) && manufacturer_id.is_none() {
        return Err(CoreError::Validation(
            "Assign a manufacturer to the order before routing to the manufacturer".into(),
        ));
    }
    Ok(())
}

/// The manufacturer may only be changed while it holds none of the order's
/// products and not its sample. Otherwise those items would be left with a
/// holder nobody can act as.
pub fn check_manufacturer_change(
    current: Option<DbId>,
    next: Option<DbId>,
    held_by_manufacturer: i64,
) -> Result<(), CoreError> {
    if current != next && held_by_manufacturer > 0 {
        return Err(CoreError::Conflict(format!(
            "{held_by_manufacturer} item(s) of this order are with the manufacturer; \
             wait for them to come back before changing the manufacturer"
        )));
    }
    Ok(())
}

/// A sample may stop being required only while admin holds it.
pub fn check_sample_requirement(
    required: bool,
    next_required: Option<bool>,
    holder: Role,
) -> Result<(), CoreError> {
    if required && next_required == Some(false) && holder != Role::Admin {
        return Err(CoreError::Conflict(format!(
            "The sample is with the {holder}; recall it before dropping the sample"
        )));
    }
    Ok(())
}

/// An approved sample's fee is frozen.
pub fn check_sample_fee(
    locked: bool,
    current: Option<Cents>,
    next: Option<Cents>,
) -> Result<(), CoreError> {
    match next {
        Some(fee) if locked && current != Some(fee) => Err(CoreError::Conflict(
            "The sample is approved; reopen it before changing the fee".into(),
        )),
        _ => Ok(()),
    }
}

/// Order status implied by the stages of its products.
///
/// Draft and submitted orders move to `in_progress` once any product reaches
/// production, and any open order moves to `completed` once every product is
/// completed. Cancelled orders never change.
pub fn derive_status(current: OrderStatus, product_stages: &[Stage]) -> OrderStatus {
    if current == OrderStatus::Cancelled || product_stages.is_empty() {
        return current;
    }
    if product_stages.iter().all(|s| *s == Stage::Completed) {
        return OrderStatus::Completed;
    }
    let started = product_stages
        .iter()
        .any(|s| matches!(s, Stage::InProduction | Stage::Shipped | Stage::Completed));
    if started && matches!(current, OrderStatus::Draft | OrderStatus::Submitted) {
        return OrderStatus::InProgress;
    }
    current
}

// ---------------------------------------------------------------------------
// Order numbers
// ---------------------------------------------------------------------------

/// Format an order number like `ORD-2026-000042`.
pub fn format_order_number(year: i32, sequence: i64) -> String {
    format!("{ORDER_NUMBER_PREFIX}-{year}-{sequence:06}")
}

// ---------------------------------------------------------------------------
// Validation and visibility
// ---------------------------------------------------------------------------

pub fn validate_order_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Order name cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_ORDER_NAME_LENGTH {
        return Err(format!(
            "Order name exceeds maximum length of {MAX_ORDER_NAME_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Whether a user may see an order at all.
///
/// Admins see every order; clients see their own; manufacturers see orders
/// assigned to them.
pub fn can_view_order(
    role: Role,
    user_id: DbId,
    client_id: DbId,
    manufacturer_id: Option<DbId>,
) -> bool {
    match role {
        Role::Admin => true,
        Role::Client => client_id == user_id,
        Role::Manufacturer => manufacturer_id == Some(user_id),
    }
}
