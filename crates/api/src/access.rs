//! Loading rows the caller is allowed to see.
//!
//! A row on an order the caller cannot see is reported as missing, so ids of
//! other parties' orders are never confirmed.

use orderflow_core::error::CoreError;
use orderflow_core::orders::check_editable;
use orderflow_core::types::DbId;
use orderflow_db::models::order::Order;
use orderflow_db::models::product::OrderProduct;
use orderflow_db::repositories::{OrderRepo, ProductRepo};
use orderflow_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// The order with `id`, if `user` may see it.
pub async fn visible_order(pool: &DbPool, user: &AuthUser, id: DbId) -> AppResult<Order> {
    OrderRepo::find_by_id(pool, id)
        .await?
        .filter(|order| order.visible_to(user.role, user.user_id))
        .ok_or_else(|| CoreError::not_found("Order", id).into())
}

/// The product with `id` and its order, if `user` may see the order.
pub async fn visible_product(
    pool: &DbPool,
    user: &AuthUser,
    id: DbId,
) -> AppResult<(Order, OrderProduct)> {
    let not_found = || CoreError::not_found("Product", id);
    let product = ProductRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(not_found)?;
    let order = OrderRepo::find_by_id(pool, product.order_id)
        .await?
        .filter(|order| order.visible_to(user.role, user.user_id))
        .ok_or_else(not_found)?;
    Ok((order, product))
}

/// Reject changes inside a completed or cancelled order.
pub fn ensure_open(order: &Order) -> AppResult<()> {
    check_editable(order.status()?)?;
    Ok(())
}

/// Reject changes to a locked product.
pub fn ensure_unlocked(product: &OrderProduct) -> AppResult<()> {
    if product.is_locked {
        return Err(product_locked(product));
    }
    Ok(())
}

pub fn product_locked(product: &OrderProduct) -> AppError {
    CoreError::Conflict(format!(
        "Product \"{}\" is locked; reopen it before editing",
        product.name
    ))
    .into()
}

/// Clients may only change products on their own orders; admins anywhere.
pub fn ensure_order_owner_or_admin(user: &AuthUser, order: &Order) -> AppResult<()> {
    if user.is_admin() || order.client_id == user.user_id {
        return Ok(());
    }
    Err(CoreError::Forbidden("Only the order's client or an admin may do this".into()).into())
}
