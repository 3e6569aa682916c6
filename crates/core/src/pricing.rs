//! Pricing arithmetic in integer cents.
//!
//! Manufacturer figures are costs, client figures are prices; the margin is
//! the difference. Unset prices count as zero. All arithmetic is checked so
//! absurd quantities surface as validation errors rather than wrapping.

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::Cents;

/// Upper bound accepted for any single money field (one billion dollars).
pub const MAX_CENTS: Cents = 100_000_000_000;

/// Basis points in 100%.
const BPS_SCALE: i128 = 10_000;

fn overflow() -> CoreError {
    CoreError::Validation("Pricing total is out of range".into())
}

pub fn validate_cents(field: &str, value: Cents) -> Result<(), String> {
    if !(0..=MAX_CENTS).contains(&value) {
        return Err(format!("{field} must be between 0 and {MAX_CENTS} cents"));
    }
    Ok(())
}

/// `unit × quantity`, checked.
pub fn line_total(unit: Cents, quantity: i64) -> Result<Cents, CoreError> {
    unit.checked_mul(quantity).ok_or_else(overflow)
}

/// Apply a markup expressed in basis points, rounding half-up to the cent.
///
/// `apply_markup(1000, 2500)` is a 25% markup on $10.00 and yields 1250.
pub fn apply_markup(cost: Cents, markup_bps: i64) -> Result<Cents, CoreError> {
    if cost < 0 || markup_bps < 0 {
        return Err(CoreError::Validation(
            "Cost and markup must not be negative".into(),
        ));
    }
    let scaled = i128::from(cost) * (BPS_SCALE + i128::from(markup_bps));
    let rounded = (scaled + BPS_SCALE / 2) / BPS_SCALE;
    Cents::try_from(rounded).map_err(|_| overflow())
}

/// Per-unit and shipping figures of one product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductPricing {
    pub manufacturer_unit_cost: Option<Cents>,
    pub client_unit_price: Option<Cents>,
    pub manufacturer_shipping: Option<Cents>,
    pub client_shipping: Option<Cents>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub manufacturer_total: Cents,
    pub client_total: Cents,
}

impl Totals {
    pub fn margin(&self) -> Cents {
        self.client_total - self.manufacturer_total
    }

    fn add(self, other: Totals) -> Result<Totals, CoreError> {
        Ok(Totals {
            manufacturer_total: self
                .manufacturer_total
                .checked_add(other.manufacturer_total)
                .ok_or_else(overflow)?,
            client_total: self
                .client_total
                .checked_add(other.client_total)
                .ok_or_else(overflow)?,
        })
    }
}

/// Totals of one product given the quantities of its items.
pub fn product_totals(pricing: &ProductPricing, quantities: &[i64]) -> Result<Totals, CoreError> {
    let quantity = quantities
        .iter()
        .try_fold(0i64, |acc, q| acc.checked_add(*q))
        .ok_or_else(overflow)?;

    let cost = line_total(pricing.manufacturer_unit_cost.unwrap_or(0), quantity)?
        .checked_add(pricing.manufacturer_shipping.unwrap_or(0))
        .ok_or_else(overflow)?;
    let price = line_total(pricing.client_unit_price.unwrap_or(0), quantity)?
        .checked_add(pricing.client_shipping.unwrap_or(0))
        .ok_or_else(overflow)?;

    Ok(Totals {
        manufacturer_total: cost,
        client_total: price,
    })
}

/// Totals of one accessory line.
pub fn accessory_totals(
    unit_cost: Cents,
    client_unit_price: Cents,
    quantity: i64,
) -> Result<Totals, CoreError> {
    Ok(Totals {
        manufacturer_total: line_total(unit_cost, quantity)?,
        client_total: line_total(client_unit_price, quantity)?,
    })
}

/// Full breakdown of an order's money.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderTotals {
    pub products: Totals,
    pub accessories: Totals,
    /// Charged to the client only.
    pub sample_fee: Cents,
}

impl OrderTotals {
    pub fn build(
        products: &[Totals],
        accessories: &[Totals],
        sample_fee: Option<Cents>,
    ) -> Result<Self, CoreError> {
        let sum = |lines: &[Totals]| {
            lines
                .iter()
                .try_fold(Totals::default(), |acc, line| acc.add(*line))
        };
        Ok(Self {
            products: sum(products)?,
            accessories: sum(accessories)?,
            sample_fee: sample_fee.unwrap_or(0),
        })
    }

    pub fn grand_total(&self) -> Result<Totals, CoreError> {
        let mut total = self.products.add(self.accessories)?;
        total.client_total = total
            .client_total
            .checked_add(self.sample_fee)
            .ok_or_else(overflow)?;
        Ok(total)
    }

    /// What `role` is allowed to see.
    ///
    /// Manufacturers never see client prices and clients never see
    /// manufacturer costs; only admins see the margin.
    pub fn project(&self, role: Role) -> Result<PricingSummary, CoreError> {
        let grand = self.grand_total()?;
        let (show_cost, show_price) = match role {
            Role::Admin => (true, true),
            Role::Manufacturer => (true, false),
            Role::Client => (false, true),
        };
        Ok(PricingSummary {
            products_cost: show_cost.then_some(self.products.manufacturer_total),
            accessories_cost: show_cost.then_some(self.accessories.manufacturer_total),
            total_cost: show_cost.then_some(grand.manufacturer_total),
            products_price: show_price.then_some(self.products.client_total),
            accessories_price: show_price.then_some(self.accessories.client_total),
            sample_fee: show_price.then_some(self.sample_fee),
            total_price: show_price.then_some(grand.client_total),
            margin: role.is_admin().then_some(grand.margin()),
        })
    }
}

/// Role-projected order totals, as returned by the summary endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products_cost: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessories_cost: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products_price: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessories_price: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_fee: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Cents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Cents>,
}
