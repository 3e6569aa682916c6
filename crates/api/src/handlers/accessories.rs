//! Handlers for order accessories. Changes are admin-only; reads are
//! projected for the caller's role.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::pricing::validate_cents;
use orderflow_core::types::{Cents, DbId};
use orderflow_core::validation::{validate_input, MAX_QUANTITY};
use orderflow_db::models::accessory::{CreateAccessory, OrderAccessory, UpdateAccessory};
use orderflow_db::models::audit::NewAuditEntry;
use orderflow_db::repositories::{AccessoryRepo, AuditLogRepo};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::access::{ensure_open, visible_order};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccessoryRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, max = MAX_QUANTITY, message = "must be between 1 and 1000000"))]
    pub quantity: i32,
    pub unit_cost_cents: Option<Cents>,
    pub client_unit_price_cents: Option<Cents>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccessoryRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = MAX_QUANTITY, message = "must be between 1 and 1000000"))]
    pub quantity: Option<i32>,
    pub unit_cost_cents: Option<Cents>,
    pub client_unit_price_cents: Option<Cents>,
}

fn check_prices(unit_cost: Option<Cents>, client_price: Option<Cents>) -> AppResult<()> {
    for (field, value) in [
        ("unit_cost_cents", unit_cost),
        ("client_unit_price_cents", client_price),
    ] {
        if let Some(value) = value {
            validate_cents(field, value)
                .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
        }
    }
    Ok(())
}

/// GET /api/v1/orders/{id}/accessories
pub async fn list_accessories(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<OrderAccessory>>>> {
    visible_order(&state.pool, &user, order_id).await?;
    let data = AccessoryRepo::list_by_order(&state.pool, order_id)
        .await?
        .into_iter()
        .map(|a| a.redacted_for(user.role))
        .collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/orders/{id}/accessories
pub async fn create_accessory(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(order_id): Path<DbId>,
    Json(input): Json<CreateAccessoryRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<OrderAccessory>>)> {
    validate_input(&input)?;
    check_prices(input.unit_cost_cents, input.client_unit_price_cents)?;
    let order = visible_order(&state.pool, &admin, order_id).await?;
    ensure_open(&order)?;

    let accessory = AccessoryRepo::create(
        &state.pool,
        &CreateAccessory {
            order_id,
            name: input.name.trim().to_string(),
            description: input.description,
            quantity: input.quantity,
            unit_cost_cents: input.unit_cost_cents,
            client_unit_price_cents: input.client_unit_price_cents,
        },
    )
    .await?;

    record(&state, &admin, action_types::ACCESSORY_CREATE, &accessory).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: accessory })))
}

/// PUT /api/v1/accessories/{id}
pub async fn update_accessory(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAccessoryRequest>,
) -> AppResult<Json<DataResponse<OrderAccessory>>> {
    validate_input(&input)?;
    check_prices(input.unit_cost_cents, input.client_unit_price_cents)?;
    let existing = find_accessory(&state, id).await?;
    let order = visible_order(&state.pool, &admin, existing.order_id).await?;
    ensure_open(&order)?;

    let accessory = AccessoryRepo::update(
        &state.pool,
        id,
        &UpdateAccessory {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            quantity: input.quantity,
            unit_cost_cents: input.unit_cost_cents,
            client_unit_price_cents: input.client_unit_price_cents,
        },
    )
    .await?
    .ok_or(CoreError::not_found("Accessory", id))?;

    record(&state, &admin, action_types::ACCESSORY_UPDATE, &accessory).await?;
    Ok(Json(DataResponse { data: accessory }))
}

/// DELETE /api/v1/accessories/{id}
pub async fn delete_accessory(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let accessory = find_accessory(&state, id).await?;
    let order = visible_order(&state.pool, &admin, accessory.order_id).await?;
    ensure_open(&order)?;

    if !AccessoryRepo::delete(&state.pool, id).await? {
        return Err(CoreError::not_found("Accessory", id)
        .into());
    }
    record(&state, &admin, action_types::ACCESSORY_DELETE, &accessory).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_accessory(state: &AppState, id: DbId) -> AppResult<OrderAccessory> {
    Ok(AccessoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::not_found("Accessory", id))?)
}

async fn record(
    state: &AppState,
    admin: &AuthUser,
    action: &str,
    accessory: &OrderAccessory,
) -> AppResult<()> {
    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(admin.user_id, action, entity_types::ACCESSORY, accessory.id)
            .order(accessory.order_id)
            .details(json!({ "name": accessory.name, "quantity": accessory.quantity })),
    )
    .await?;
    tracing::info!(
        user_id = admin.user_id,
        order_id = accessory.order_id,
        accessory_id = accessory.id,
        action,
        "Accessory changed"
    );
    Ok(())
}
