//! Handlers for product items (variant lines with quantities).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::types::DbId;
use orderflow_core::validation::{validate_input, MAX_QUANTITY};
use orderflow_db::models::audit::NewAuditEntry;
use orderflow_db::models::item::{CreateItem, OrderItem, UpdateItem};
use orderflow_db::models::order::Order;
use orderflow_db::models::product::OrderProduct;
use orderflow_db::repositories::{AuditLogRepo, ItemRepo};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::access::{
    ensure_open, ensure_order_owner_or_admin, ensure_unlocked, product_locked, visible_product,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdminOrClient;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub variant: String,
    #[validate(range(min = 1, max = MAX_QUANTITY, message = "must be between 1 and 1000000"))]
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub variant: Option<String>,
    #[validate(range(min = 1, max = MAX_QUANTITY, message = "must be between 1 and 1000000"))]
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

/// GET /api/v1/products/{id}/items
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<OrderItem>>>> {
    visible_product(&state.pool, &user, product_id).await?;
    let data = ItemRepo::list_by_product(&state.pool, product_id).await?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/products/{id}/items
pub async fn create_item(
    State(state): State<AppState>,
    RequireAdminOrClient(user): RequireAdminOrClient,
    Path(product_id): Path<DbId>,
    Json(input): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<OrderItem>>)> {
    validate_input(&input)?;
    let (order, product) = editable_product(&state, &user, product_id).await?;

    let item = ItemRepo::create(
        &state.pool,
        &CreateItem {
            product_id,
            variant: input.variant.trim().to_string(),
            quantity: input.quantity,
            notes: input.notes,
        },
    )
    .await?
    .ok_or_else(|| product_locked(&product))?;

    audit(&state, &user, action_types::ITEM_CREATE, &order, &item).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// PUT /api/v1/items/{id}
pub async fn update_item(
    State(state): State<AppState>,
    RequireAdminOrClient(user): RequireAdminOrClient,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateItemRequest>,
) -> AppResult<Json<DataResponse<OrderItem>>> {
    validate_input(&input)?;
    let existing = find_item(&state, id).await?;
    let (order, product) = editable_product(&state, &user, existing.product_id).await?;

    let item = match ItemRepo::update(
        &state.pool,
        id,
        &UpdateItem {
            variant: input.variant.map(|v| v.trim().to_string()),
            quantity: input.quantity,
            notes: input.notes,
        },
    )
    .await?
    {
        Some(item) => item,
        None => return Err(refused(&state, id, &product).await),
    };

    audit(&state, &user, action_types::ITEM_UPDATE, &order, &item).await?;
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/items/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    RequireAdminOrClient(user): RequireAdminOrClient,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let item = find_item(&state, id).await?;
    let (order, product) = editable_product(&state, &user, item.product_id).await?;

    if !ItemRepo::delete(&state.pool, id).await? {
        return Err(refused(&state, id, &product).await);
    }
    audit(&state, &user, action_types::ITEM_DELETE, &order, &item).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_item(state: &AppState, id: DbId) -> AppResult<OrderItem> {
    Ok(ItemRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::not_found("Item", id))?)
}

/// Why a guarded item write matched nothing: the item is gone, or its
/// product was locked after `editable_product` looked.
async fn refused(state: &AppState, id: DbId, product: &OrderProduct) -> AppError {
    match ItemRepo::find_by_id(&state.pool, id).await {
        Ok(Some(_)) => product_locked(product),
        Ok(None) => CoreError::not_found("Item", id).into(),
        Err(err) => err.into(),
    }
}

/// The product, if the caller may change its items right now.
async fn editable_product(
    state: &AppState,
    user: &AuthUser,
    product_id: DbId,
) -> AppResult<(Order, OrderProduct)> {
    let (order, product) = visible_product(&state.pool, user, product_id).await?;
    ensure_order_owner_or_admin(user, &order)?;
    ensure_open(&order)?;
    ensure_unlocked(&product)?;
    Ok((order, product))
}

async fn audit(
    state: &AppState,
    user: &AuthUser,
    action: &str,
    order: &Order,
    item: &OrderItem,
) -> AppResult<()> {
    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(user.user_id, action, entity_types::ITEM, item.id)
            .order(order.id)
            .details(json!({
                "product_id": item.product_id,
                "variant": item.variant,
                "quantity": item.quantity,
            })),
    )
    .await?;
    tracing::info!(
        user_id = user.user_id,
        order_id = order.id,
        product_id = item.product_id,
        item_id = item.id,
        action,
        "Item changed"
    );
    Ok(())
}
