//! Handlers for the `/orders` resource: CRUD, lifecycle, manufacturer
//! assignment, the sample's admin fields, pricing summary and history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::orders::{check_cancel, check_submit, validate_order_name, OrderStatus};
use orderflow_core::pricing::{product_totals, validate_cents, OrderTotals, PricingSummary};
use orderflow_core::roles::{ROLE_ID_CLIENT, ROLE_ID_MANUFACTURER};
use orderflow_core::types::{Cents, DbId};
use orderflow_db::models::accessory::OrderAccessory;
use orderflow_db::models::audit::{AuditLog, NewAuditEntry};
use orderflow_db::models::notification::kinds;
use orderflow_db::models::order::{CreateOrder, Order, OrderScope, UpdateOrder, UpdateSample};
use orderflow_db::repositories::{
    AccessoryRepo, AuditLogRepo, ItemRepo, OrderRepo, ProductRepo, UserRepo,
};
use orderflow_events::OrderEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::access::{ensure_open, visible_order};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAdmin, RequireAdminOrClient};
use crate::notifications::{admin_ids, notify};
use crate::query::PaginationParams;
use crate::response::{DataResponse, Page};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for `POST /orders`.
///
/// Admins must name the client; a client's own request always belongs to
/// them and cannot pick a manufacturer.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub name: String,
    pub description: Option<String>,
    pub client_id: Option<DbId>,
    pub manufacturer_id: Option<DbId>,
    #[serde(default)]
    pub sample_required: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Request body for `PUT /orders/{id}/manufacturer`. `null` unassigns.
#[derive(Debug, Deserialize)]
pub struct AssignManufacturerRequest {
    pub manufacturer_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSampleRequest {
    pub sample_required: Option<bool>,
    pub sample_fee_cents: Option<Cents>,
    pub sample_notes: Option<String>,
    pub sample_eta: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub order_id: DbId,
    pub product_count: usize,
    pub total_quantity: i64,
    pub totals: PricingSummary,
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/orders
///
/// Orders visible to the caller, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<OrderListParams>,
) -> AppResult<Json<DataResponse<Page<Order>>>> {
    let status = params
        .status
        .as_deref()
        .map(OrderStatus::parse)
        .transpose()?
        .map(OrderStatus::as_str);
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();

    let scope = OrderScope::for_user(user.role, user.user_id);
    let items = OrderRepo::list(&state.pool, scope, status, limit, offset)
        .await?
        .into_iter()
        .map(|o| o.redacted_for(user.role))
        .collect();
    let total = OrderRepo::count(&state.pool, scope, status).await?;

    Ok(Json(DataResponse {
        data: Page { items, total },
    }))
}

/// POST /api/v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    RequireAdminOrClient(user): RequireAdminOrClient,
    Json(input): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Order>>)> {
    validate_order_name(&input.name).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let (client_id, is_client_request) = if user.is_admin() {
        let client_id = input.client_id.ok_or_else(|| {
            AppError::Core(CoreError::Validation("client_id is required".into()))
        })?;
        if !UserRepo::has_active_role(&state.pool, client_id, ROLE_ID_CLIENT).await? {
            return Err(AppError::Core(CoreError::Validation(format!(
                "User {client_id} is not an active client"
            ))));
        }
        (client_id, false)
    } else {
        if input.manufacturer_id.is_some() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Clients cannot assign a manufacturer".into(),
            )));
        }
        (user.user_id, true)
    };

    if let Some(manufacturer_id) = input.manufacturer_id {
        ensure_manufacturer(&state, manufacturer_id).await?;
    }

    let order = OrderRepo::create(
        &state.pool,
        &CreateOrder {
            name: input.name.trim().to_string(),
            description: input.description,
            client_id,
            manufacturer_id: input.manufacturer_id,
            is_client_request,
            created_by: user.user_id,
            sample_required: input.sample_required,
        },
    )
    .await?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            user.user_id,
            action_types::ORDER_CREATE,
            entity_types::ORDER,
            order.id,
        )
        .order(order.id)
        .details(json!({
            "order_number": order.order_number,
            "client_id": order.client_id,
            "is_client_request": order.is_client_request,
        })),
    )
    .await?;

    if is_client_request {
        let message = format!(
            "New client request {}: \"{}\"",
            order.order_number, order.name
        );
        notify(
            &state,
            kinds::CLIENT_REQUEST,
            OrderEvent::new("order.client_request", order.id, message)
                .with_actor(user.user_id)
                .with_recipients(admin_ids(&state).await?),
        )
        .await?;
    }

    tracing::info!(
        user_id = user.user_id,
        order_id = order.id,
        order_number = %order.order_number,
        is_client_request,
        "Order created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: order })))
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = visible_order(&state.pool, &user, id).await?;
    Ok(Json(DataResponse {
        data: order.redacted_for(user.role),
    }))
}

/// PUT /api/v1/orders/{id}
pub async fn update_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOrderRequest>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = visible_order(&state.pool, &admin, id).await?;
    ensure_open(&order)?;
    if let Some(name) = &input.name {
        validate_order_name(name).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    }

    let updated = OrderRepo::update(
        &state.pool,
        id,
        &UpdateOrder {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
        },
    )
    .await?
    .ok_or(CoreError::not_found("Order", id))?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(admin.user_id, action_types::ORDER_UPDATE, entity_types::ORDER, id)
            .order(id),
    )
    .await?;

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/orders/{id}
///
/// Deletes the order with everything attached to it, including stored media
/// files. Returns 204 No Content.
pub async fn delete_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let order = visible_order(&state.pool, &admin, id).await?;

    if !OrderRepo::delete(&state.pool, id).await? {
        return Err(CoreError::not_found("Order", id).into());
    }

    let media_dir = state.config.media_root.join("orders").join(id.to_string());
    if let Err(e) = tokio::fs::remove_dir_all(&media_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(error = %e, order_id = id, "Failed to remove order media directory");
        }
    }

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(admin.user_id, action_types::ORDER_DELETE, entity_types::ORDER, id)
            .order(id)
            .details(json!({ "order_number": order.order_number })),
    )
    .await?;

    tracing::info!(user_id = admin.user_id, order_id = id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/orders/{id}/submit
///
/// Move a draft order to `submitted` and tell the client.
pub async fn submit_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = visible_order(&state.pool, &admin, id).await?;
    check_submit(order.status()?)?;

    let updated = change_status(&state, &admin, &order, OrderStatus::Submitted).await?;
    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(admin.user_id, action_types::ORDER_SUBMIT, entity_types::ORDER, id)
            .order(id),
    )
    .await?;

    notify(
        &state,
        kinds::ORDER_STATUS,
        OrderEvent::new(
            "order.submit",
            id,
            format!("Order {} was submitted", updated.order_number),
        )
        .with_actor(admin.user_id)
        .with_recipients(vec![updated.client_id]),
    )
    .await?;

    Ok(Json(DataResponse { data: updated }))
}

/// POST /api/v1/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = visible_order(&state.pool, &admin, id).await?;
    check_cancel(order.status()?)?;

    let updated = change_status(&state, &admin, &order, OrderStatus::Cancelled).await?;
    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(admin.user_id, action_types::ORDER_CANCEL, entity_types::ORDER, id)
            .order(id),
    )
    .await?;

    let mut recipients = vec![updated.client_id];
    recipients.extend(updated.manufacturer_id);
    notify(
        &state,
        kinds::ORDER_STATUS,
        OrderEvent::new(
            "order.cancel",
            id,
            format!("Order {} was cancelled", updated.order_number),
        )
        .with_actor(admin.user_id)
        .with_recipients(recipients),
    )
    .await?;

    Ok(Json(DataResponse { data: updated }))
}

/// PUT /api/v1/orders/{id}/manufacturer
pub async fn assign_manufacturer(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<AssignManufacturerRequest>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = visible_order(&state.pool, &admin, id).await?;
    ensure_open(&order)?;
    if let Some(manufacturer_id) = input.manufacturer_id {
        ensure_manufacturer(&state, manufacturer_id).await?;
    }

    let updated = OrderRepo::assign_manufacturer(&state.pool, id, input.manufacturer_id).await?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            admin.user_id,
            action_types::MANUFACTURER_ASSIGN,
            entity_types::ORDER,
            id,
        )
        .order(id)
        .details(json!({
            "from": order.manufacturer_id,
            "to": input.manufacturer_id,
        })),
    )
    .await?;

    if let Some(manufacturer_id) = input.manufacturer_id {
        notify(
            &state,
            kinds::ORDER_ASSIGNED,
            OrderEvent::new(
                "order.assign",
                id,
                format!("Order {} was assigned to you", updated.order_number),
            )
            .with_actor(admin.user_id)
            .with_recipients(vec![manufacturer_id]),
        )
        .await?;
    }

    tracing::info!(
        user_id = admin.user_id,
        order_id = id,
        manufacturer_id = ?input.manufacturer_id,
        "Manufacturer assigned"
    );
    Ok(Json(DataResponse { data: updated }))
}

/// PUT /api/v1/orders/{id}/sample
///
/// Admin-managed sample fields. The fee is frozen once the sample is
/// approved, and the sample can only be dropped while admin holds it.
pub async fn update_sample(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSampleRequest>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = visible_order(&state.pool, &admin, id).await?;
    ensure_open(&order)?;
    if let Some(fee) = input.sample_fee_cents {
        validate_cents("sample_fee_cents", fee)
            .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    }

    let updated = OrderRepo::update_sample(
        &state.pool,
        id,
        &UpdateSample {
            sample_required: input.sample_required,
            sample_fee_cents: input.sample_fee_cents,
            sample_notes: input.sample_notes,
            sample_eta: input.sample_eta,
        },
    )
    .await?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            admin.user_id,
            action_types::SAMPLE_UPDATE,
            entity_types::SAMPLE,
            id,
        )
        .order(id)
        .details(json!({
            "sample_required": updated.sample_required,
            "sample_fee_cents": updated.sample_fee_cents,
        })),
    )
    .await?;

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/{id}/summary
///
/// Order totals, with the figures the caller may not see left out.
pub async fn order_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<OrderSummary>>> {
    let order = visible_order(&state.pool, &user, id).await?;

    let products = ProductRepo::list_by_order(&state.pool, id).await?;
    let quantities = ItemRepo::quantities_for_order(&state.pool, id).await?;
    let product_lines = products
        .iter()
        .map(|product| {
            let qs: Vec<i64> = quantities
                .iter()
                .filter(|(product_id, _)| *product_id == product.id)
                .map(|(_, q)| i64::from(*q))
                .collect();
            product_totals(&product.pricing(), &qs)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let accessory_lines = AccessoryRepo::list_by_order(&state.pool, id)
        .await?
        .iter()
        .map(OrderAccessory::totals)
        .collect::<Result<Vec<_>, _>>()?;

    let sample_fee = if order.sample_required {
        order.sample_fee_cents
    } else {
        None
    };
    let totals = OrderTotals::build(&product_lines, &accessory_lines, sample_fee)?;

    Ok(Json(DataResponse {
        data: OrderSummary {
            order_id: id,
            product_count: products.len(),
            total_quantity: quantities.iter().map(|(_, q)| i64::from(*q)).sum(),
            totals: totals.project(user.role)?,
        },
    }))
}

/// GET /api/v1/orders/{id}/history
///
/// Audit entries for the order, oldest first.
pub async fn order_history(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AuditLog>>>> {
    visible_order(&state.pool, &admin, id).await?;
    let entries = AuditLogRepo::list_for_order(&state.pool, id).await?;
    Ok(Json(DataResponse { data: entries }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_manufacturer(state: &AppState, manufacturer_id: DbId) -> AppResult<()> {
    if !UserRepo::has_active_role(&state.pool, manufacturer_id, ROLE_ID_MANUFACTURER).await? {
        return Err(AppError::Core(CoreError::Validation(format!(
            "User {manufacturer_id} is not an active manufacturer"
        ))));
    }
    Ok(())
}

async fn change_status(
    state: &AppState,
    user: &AuthUser,
    order: &Order,
    to: OrderStatus,
) -> AppResult<Order> {
    let from = order.status()?;
    let updated = OrderRepo::set_status(&state.pool, order.id, from, to)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!(
                "Order {} changed status while this request was in flight; reload and retry",
                order.order_number
            ))
        })?;
    tracing::info!(
        user_id = user.user_id,
        order_id = order.id,
        from = %order.status,
        to = %to,
        "Order status changed"
    );
    Ok(updated)
}
