//! Handlers for order products and their pricing.
//!
//! Every response is projected for the caller's role: manufacturers never
//! receive client prices and clients never receive manufacturer costs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::pricing::{apply_markup, validate_cents};
use orderflow_core::roles::Role;
use orderflow_core::types::{Cents, DbId};
use orderflow_core::validation::require_non_blank;
use orderflow_db::models::audit::NewAuditEntry;
use orderflow_db::models::product::{CreateProduct, OrderProduct, UpdatePricing, UpdateProduct};
use orderflow_db::repositories::{AuditLogRepo, ProductRepo};
use serde::Deserialize;
use serde_json::json;

use crate::access::{
    ensure_open, ensure_order_owner_or_admin, ensure_unlocked, visible_order, visible_product,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireAdminOrClient};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Admins may set every field; manufacturers only the fulfilment fields.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub production_eta: Option<NaiveDate>,
    pub tracking_number: Option<String>,
}

impl UpdateProductRequest {
    fn touches_descriptive_fields(&self) -> bool {
        self.name.is_some() || self.description.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePricingRequest {
    pub manufacturer_unit_cost_cents: Option<Cents>,
    pub client_unit_price_cents: Option<Cents>,
    pub manufacturer_shipping_cents: Option<Cents>,
    pub client_shipping_cents: Option<Cents>,
    /// Derive the client unit price from the manufacturer unit cost, in
    /// basis points over cost. Excludes `client_unit_price_cents`.
    pub markup_bps: Option<i64>,
}

impl UpdatePricingRequest {
    fn validate(&self) -> Result<(), CoreError> {
        let fields = [
            ("manufacturer_unit_cost_cents", self.manufacturer_unit_cost_cents),
            ("client_unit_price_cents", self.client_unit_price_cents),
            ("manufacturer_shipping_cents", self.manufacturer_shipping_cents),
            ("client_shipping_cents", self.client_shipping_cents),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                validate_cents(field, value).map_err(CoreError::Validation)?;
            }
        }
        Ok(())
    }

    /// The column update, with a markup resolved against the cost being
    /// sent or, failing that, the cost already stored on `product`.
    fn into_update(self, product: &OrderProduct) -> Result<UpdatePricing, CoreError> {
        let client_unit_price_cents = match self.markup_bps {
            None => self.client_unit_price_cents,
            Some(_) if self.client_unit_price_cents.is_some() => {
                return Err(CoreError::Validation(
                    "Send either client_unit_price_cents or markup_bps, not both".into(),
                ))
            }
            Some(bps) => {
                let cost = self
                    .manufacturer_unit_cost_cents
                    .or(product.manufacturer_unit_cost_cents)
                    .ok_or_else(|| {
                        CoreError::Validation(
                            "markup_bps needs a manufacturer unit cost to apply to".into(),
                        )
                    })?;
                let price = apply_markup(cost, bps)?;
                validate_cents("client_unit_price_cents", price).map_err(CoreError::Validation)?;
                Some(price)
            }
        };
        Ok(UpdatePricing {
            manufacturer_unit_cost_cents: self.manufacturer_unit_cost_cents,
            client_unit_price_cents,
            manufacturer_shipping_cents: self.manufacturer_shipping_cents,
            client_shipping_cents: self.client_shipping_cents,
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/{id}/products
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<OrderProduct>>>> {
    visible_order(&state.pool, &user, order_id).await?;
    let data = ProductRepo::list_by_order(&state.pool, order_id)
        .await?
        .into_iter()
        .map(|p| p.redacted_for(user.role))
        .collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/orders/{id}/products
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdminOrClient(user): RequireAdminOrClient,
    Path(order_id): Path<DbId>,
    Json(input): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<OrderProduct>>)> {
    let order = visible_order(&state.pool, &user, order_id).await?;
    ensure_order_owner_or_admin(&user, &order)?;
    ensure_open(&order)?;
    require_non_blank("name", &input.name)?;

    let product = ProductRepo::create(
        &state.pool,
        &CreateProduct {
            order_id,
            name: input.name.trim().to_string(),
            description: input.description,
        },
    )
    .await?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            user.user_id,
            action_types::PRODUCT_CREATE,
            entity_types::PRODUCT,
            product.id,
        )
        .order(order_id)
        .details(json!({ "name": product.name })),
    )
    .await?;

    tracing::info!(
        user_id = user.user_id,
        order_id,
        product_id = product.id,
        "Product created"
    );
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: product.redacted_for(user.role),
        }),
    ))
}

/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<OrderProduct>>> {
    let (_, product) = visible_product(&state.pool, &user, id).await?;
    Ok(Json(DataResponse {
        data: product.redacted_for(user.role),
    }))
}

/// PUT /api/v1/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProductRequest>,
) -> AppResult<Json<DataResponse<OrderProduct>>> {
    let (order, product) = visible_product(&state.pool, &user, id).await?;
    ensure_open(&order)?;

    match user.role {
        Role::Admin => {}
        Role::Manufacturer if !input.touches_descriptive_fields() => {}
        Role::Manufacturer => {
            return Err(CoreError::Forbidden(
                "Manufacturers may only update production_eta and tracking_number".into(),
            )
            .into())
        }
        Role::Client => {
            return Err(CoreError::Forbidden("Clients cannot edit products".into()).into())
        }
    }
    if input.touches_descriptive_fields() {
        ensure_unlocked(&product)?;
    }
    if let Some(name) = &input.name {
        require_non_blank("name", name)?;
    }

    let updated = ProductRepo::update(
        &state.pool,
        id,
        &UpdateProduct {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            production_eta: input.production_eta,
            tracking_number: input.tracking_number,
        },
    )
    .await?
    .ok_or(CoreError::not_found("Product", id))?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            user.user_id,
            action_types::PRODUCT_UPDATE,
            entity_types::PRODUCT,
            id,
        )
        .order(order.id),
    )
    .await?;

    Ok(Json(DataResponse {
        data: updated.redacted_for(user.role),
    }))
}

/// DELETE /api/v1/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let (order, product) = visible_product(&state.pool, &admin, id).await?;
    ensure_open(&order)?;
    ensure_unlocked(&product)?;

    if !ProductRepo::delete(&state.pool, id).await? {
        return Err(CoreError::not_found("Product", id)
        .into());
    }

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            admin.user_id,
            action_types::PRODUCT_DELETE,
            entity_types::PRODUCT,
            id,
        )
        .order(order.id)
        .details(json!({ "name": product.name })),
    )
    .await?;

    tracing::info!(user_id = admin.user_id, order_id = order.id, product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/products/{id}/pricing
///
/// Admins set any price field, or derive the client price with
/// `markup_bps`. A manufacturer quotes cost fields, and only while the
/// product is routed to them. Approved products are frozen.
pub async fn update_pricing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePricingRequest>,
) -> AppResult<Json<DataResponse<OrderProduct>>> {
    let (order, product) = visible_product(&state.pool, &user, id).await?;
    ensure_open(&order)?;
    input.validate()?;
    let markup_bps = input.markup_bps;
    let update = input.into_update(&product)?;

    if update.is_empty() {
        return Err(CoreError::Validation("No pricing fields supplied".into()).into());
    }
    match user.role {
        Role::Admin => {}
        Role::Manufacturer => {
            if update.touches_client_prices() {
                return Err(CoreError::Forbidden(
                    "Manufacturers may only set cost fields".into(),
                )
                .into());
            }
            if product.routing_state()?.holder != Role::Manufacturer {
                return Err(CoreError::Forbidden(
                    "The product must be routed to the manufacturer to quote costs".into(),
                )
                .into());
            }
        }
        Role::Client => {
            return Err(CoreError::Forbidden("Clients cannot change pricing".into()).into())
        }
    }
    ensure_unlocked(&product)?;

    let updated = ProductRepo::update_pricing(&state.pool, id, &update)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "The product was locked before the pricing could be saved".into(),
            ))
        })?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            user.user_id,
            action_types::PRICING_UPDATE,
            entity_types::PRODUCT,
            id,
        )
        .order(order.id)
        .details(json!({
            "manufacturer_unit_cost_cents": update.manufacturer_unit_cost_cents,
            "client_unit_price_cents": update.client_unit_price_cents,
            "manufacturer_shipping_cents": update.manufacturer_shipping_cents,
            "client_shipping_cents": update.client_shipping_cents,
            "markup_bps": markup_bps,
        })),
    )
    .await?;

    tracing::info!(
        user_id = user.user_id,
        order_id = order.id,
        product_id = id,
        role = %user.role,
        "Pricing updated"
    );
    Ok(Json(DataResponse {
        data: updated.redacted_for(user.role),
    }))
}
