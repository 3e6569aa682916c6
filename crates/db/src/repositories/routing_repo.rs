//! Transactional application of routing transitions.
//!
//! One database transaction per transition: lock the row, check the caller's
//! version, plan with [`orderflow_core::routing`], write the new holder and
//! status, append the audit entry and insert the notifications. Nothing is
//! visible to other connections until the commit.

use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::orders::{
    check_editable, check_manufacturer_assigned, derive_status, OrderStatus,
};
use orderflow_core::roles::{Role, ROLE_ID_ADMIN};
use orderflow_core::routing::{
    plan_transition, RouteAction, RoutedEntity, RoutingError, Stage, TransitionPlan,
};
use orderflow_core::types::DbId;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use crate::models::audit::NewAuditEntry;
use crate::models::notification::{kinds, NewNotification};
use crate::models::order::Order;
use crate::models::product::OrderProduct;
use crate::repositories::{
    order_repo, product_repo, AuditLogRepo, NotificationRepo, ProductRepo, UserRepo,
};

/// A caller's request to move a product or sample.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub actor_id: DbId,
    pub actor_role: Role,
    pub action: RouteAction,
    /// The `version` the caller last saw; a mismatch is a conflict.
    pub expected_version: i32,
    pub note: Option<String>,
}

/// Everything a committed transition changed.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub plan: TransitionPlan,
    /// The order after the transition (sample columns and status included).
    pub order: Order,
    /// The product after the transition; `None` for samples.
    pub product: Option<OrderProduct>,
    /// Set when the transition moved the order to a new status.
    pub order_status_change: Option<(OrderStatus, OrderStatus)>,
    /// Users who received an in-app notification.
    pub recipients: Vec<DbId>,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error(transparent)]
    Rejected(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<RoutingError> for TransitionError {
    fn from(err: RoutingError) -> Self {
        TransitionError::Rejected(err.into())
    }
}

pub struct RoutingRepo;

impl RoutingRepo {
    /// Apply `request` to a product.
    pub async fn transition_product(
        pool: &PgPool,
        product_id: DbId,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        let mut tx = pool.begin().await?;

        let product = lock_product(&mut tx, product_id)
            .await?
            .ok_or(CoreError::not_found("Product", product_id))?;
        let order = order_repo::lock_order(&mut tx, product.order_id)
            .await?
            .ok_or(CoreError::not_found("Order", product.order_id))?;
        if !order.visible_to(request.actor_role, request.actor_id) {
            return Err(CoreError::not_found("Product", product_id).into());
        }

        let order_status = order.status()?;
        check_editable(order_status)?;
        check_version("Product", product.version, request.expected_version)?;
        check_manufacturer_assigned(request.action, order.manufacturer_id)?;

        let plan = plan_transition(
            RoutedEntity::Product,
            &product.routing_state()?,
            request.actor_role,
            request.action,
        )?;

        let query = format!(
            "UPDATE order_products SET
                routed_to = $2, product_status = $3, is_locked = $4,
                version = version + 1, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            product_repo::COLUMNS
        );
        let product = sqlx::query_as::<_, OrderProduct>(&query)
            .bind(product_id)
            .bind(plan.to.holder.as_str())
            .bind(plan.to.stage.as_str())
            .bind(plan.to.locked)
            .fetch_one(&mut *tx)
            .await?;

        let stages = ProductRepo::stages_for_order(&mut *tx, order.id)
            .await?
            .iter()
            .map(|s| Stage::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let derived = derive_status(order_status, &stages);
        let (order, order_status_change) = if derived != order_status {
            let updated = set_order_status(&mut tx, order.id, derived).await?;
            (updated, Some((order_status, derived)))
        } else {
            (order, None)
        };

        let entry = NewAuditEntry::new(
            request.actor_id,
            plan.audit_action(),
            entity_types::PRODUCT,
            product.id,
        )
        .order(order.id)
        .details(transition_details(&plan, request.note.as_deref()));
        AuditLogRepo::append(&mut tx, &entry).await?;

        if let Some((from, to)) = order_status_change {
            let entry = NewAuditEntry::new(
                request.actor_id,
                action_types::ORDER_STATUS_CHANGE,
                entity_types::ORDER,
                order.id,
            )
            .order(order.id)
            .details(json!({ "from": from.as_str(), "to": to.as_str() }));
            AuditLogRepo::append(&mut tx, &entry).await?;
        }

        let message = plan.describe(&product.name);
        let recipients =
            resolve_recipients(&mut tx, &plan.notify, &order, request.actor_id).await?;
        let notifications: Vec<NewNotification> = recipients
            .iter()
            .map(|user_id| NewNotification {
                user_id: *user_id,
                order_id: Some(order.id),
                product_id: Some(product.id),
                kind: kinds::PRODUCT_ROUTED.to_string(),
                message: message.clone(),
            })
            .collect();
        NotificationRepo::insert_many(&mut tx, &notifications).await?;

        tx.commit().await?;

        Ok(TransitionOutcome {
            plan,
            order,
            product: Some(product),
            order_status_change,
            recipients,
            message,
        })
    }

    /// Apply `request` to an order's sample.
    pub async fn transition_sample(
        pool: &PgPool,
        order_id: DbId,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        let mut tx = pool.begin().await?;

        let order = order_repo::lock_order(&mut tx, order_id)
            .await?
            .filter(|o| o.visible_to(request.actor_role, request.actor_id))
            .ok_or(CoreError::not_found("Order", order_id))?;

        check_editable(order.status()?)?;
        if !order.sample_required {
            return Err(
                CoreError::Conflict("This order does not require a sample".into()).into(),
            );
        }
        check_version("Order", order.version, request.expected_version)?;
        check_manufacturer_assigned(request.action, order.manufacturer_id)?;

        let plan = plan_transition(
            RoutedEntity::Sample,
            &order.sample_state()?,
            request.actor_role,
            request.action,
        )?;

        let query = format!(
            "UPDATE orders SET
                sample_routed_to = $2, sample_status = $3, sample_locked = $4,
                version = version + 1, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            order_repo::COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(order_id)
            .bind(plan.to.holder.as_str())
            .bind(plan.to.stage.as_str())
            .bind(plan.to.locked)
            .fetch_one(&mut *tx)
            .await?;

        let entry = NewAuditEntry::new(
            request.actor_id,
            plan.audit_action(),
            entity_types::SAMPLE,
            order.id,
        )
        .order(order.id)
        .details(transition_details(&plan, request.note.as_deref()));
        AuditLogRepo::append(&mut tx, &entry).await?;

        let message = plan.describe(&order.name);
        let recipients =
            resolve_recipients(&mut tx, &plan.notify, &order, request.actor_id).await?;
        let notifications: Vec<NewNotification> = recipients
            .iter()
            .map(|user_id| NewNotification {
                user_id: *user_id,
                order_id: Some(order.id),
                product_id: None,
                kind: kinds::SAMPLE_ROUTED.to_string(),
                message: message.clone(),
            })
            .collect();
        NotificationRepo::insert_many(&mut tx, &notifications).await?;

        tx.commit().await?;

        Ok(TransitionOutcome {
            plan,
            order,
            product: None,
            order_status_change: None,
            recipients,
            message,
        })
    }
}

fn check_version(entity: &str, current: i32, expected: i32) -> Result<(), CoreError> {
    if current != expected {
        return Err(CoreError::Conflict(format!(
            "{entity} was modified by someone else (version {current}, expected {expected}); \
             reload and try again"
        )));
    }
    Ok(())
}

fn transition_details(plan: &TransitionPlan, note: Option<&str>) -> serde_json::Value {
    json!({
        "action": plan.action.as_str(),
        "destination": plan.action.destination().map(Role::as_str),
        "from_holder": plan.from.holder.as_str(),
        "to_holder": plan.to.holder.as_str(),
        "from_status": plan.from.stage.as_str(),
        "to_status": plan.to.stage.as_str(),
        "locked": plan.to.locked,
        "note": note,
    })
}

async fn lock_product(
    conn: &mut PgConnection,
    id: DbId,
) -> Result<Option<OrderProduct>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM order_products WHERE id = $1 FOR UPDATE",
        product_repo::COLUMNS
    );
    sqlx::query_as::<_, OrderProduct>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

async fn set_order_status(
    conn: &mut PgConnection,
    id: DbId,
    status: OrderStatus,
) -> Result<Order, sqlx::Error> {
    let query = format!(
        "UPDATE orders SET status = $2, version = version + 1, updated_at = NOW()
         WHERE id = $1
         RETURNING {}",
        order_repo::COLUMNS
    );
    sqlx::query_as::<_, Order>(&query)
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut *conn)
        .await
}

/// Map notified roles to user ids: every active admin, the order's assigned
/// manufacturer, the order's client. The actor never notifies themselves.
async fn resolve_recipients(
    conn: &mut PgConnection,
    roles: &[Role],
    order: &Order,
    actor_id: DbId,
) -> Result<Vec<DbId>, sqlx::Error> {
    let mut ids: Vec<DbId> = Vec::new();
    for role in roles {
        match role {
            Role::Admin => {
                ids.extend(UserRepo::active_ids_with_role(&mut *conn, ROLE_ID_ADMIN).await?)
            }
            Role::Manufacturer => ids.extend(order.manufacturer_id),
            Role::Client => ids.push(order.client_id),
        }
    }
    let mut unique: Vec<DbId> = Vec::with_capacity(ids.len());
    for id in ids {
        if id != actor_id && !unique.contains(&id) {
            unique.push(id);
        }
    }
    Ok(unique)
}
