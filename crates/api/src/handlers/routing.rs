//! Routing endpoints for products and samples.
//!
//! `GET .../routing` reports where an item is and what the caller may do
//! next; `POST .../transition` applies one action. Transitions run in a
//! single transaction inside [`RoutingRepo`]; the event for email delivery
//! is published after the commit.

use axum::extract::{Path, State};
use axum::Json;
use orderflow_core::roles::Role;
use orderflow_core::routing::{
    allowed_actions, allowed_destinations, RouteAction, RoutedEntity, RoutingState, Stage,
};
use orderflow_core::types::DbId;
use orderflow_db::models::order::Order;
use orderflow_db::models::product::OrderProduct;
use orderflow_db::repositories::{RoutingRepo, TransitionOutcome, TransitionRequest};
use orderflow_events::OrderEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::access::{visible_order, visible_product};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST .../transition`.
#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    /// `route`, `start_production`, `ship`, `approve`, `request_revision`,
    /// `complete` or `reopen`.
    pub action: String,
    /// Required for `route`: `admin`, `manufacturer` or `client`.
    pub destination: Option<String>,
    /// The `version` the caller last saw.
    pub expected_version: i32,
    pub note: Option<String>,
}

/// Where an item is and what the caller may do with it.
#[derive(Debug, Serialize)]
pub struct RoutingView {
    pub entity: RoutedEntity,
    pub id: DbId,
    pub holder: Role,
    pub status: Stage,
    pub locked: bool,
    pub version: i32,
    pub allowed_actions: Vec<RouteAction>,
    pub allowed_destinations: Vec<Role>,
}

impl RoutingView {
    fn build(
        entity: RoutedEntity,
        id: DbId,
        state: RoutingState,
        version: i32,
        actor: Role,
    ) -> Self {
        Self {
            entity,
            id,
            holder: state.holder,
            status: state.stage,
            locked: state.locked,
            version,
            allowed_actions: allowed_actions(entity, &state, actor),
            allowed_destinations: allowed_destinations(entity, &state, actor),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub message: String,
    pub order_status: String,
    /// Present for product transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<OrderProduct>,
    pub order: Order,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// GET /api/v1/products/{id}/routing
pub async fn product_routing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RoutingView>>> {
    let (_, product) = visible_product(&state.pool, &user, id).await?;
    Ok(Json(DataResponse {
        data: RoutingView::build(
            RoutedEntity::Product,
            product.id,
            product.routing_state()?,
            product.version,
            user.role,
        ),
    }))
}

/// POST /api/v1/products/{id}/transition
pub async fn transition_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(body): Json<TransitionBody>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let request = build_request(&user, body)?;
    let outcome = RoutingRepo::transition_product(&state.pool, id, &request).await?;
    Ok(Json(DataResponse {
        data: finish(&state, &user, outcome),
    }))
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// GET /api/v1/orders/{id}/sample/routing
pub async fn sample_routing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RoutingView>>> {
    let order = visible_order(&state.pool, &user, order_id).await?;
    Ok(Json(DataResponse {
        data: RoutingView::build(
            RoutedEntity::Sample,
            order.id,
            order.sample_state()?,
            order.version,
            user.role,
        ),
    }))
}

/// POST /api/v1/orders/{id}/sample/transition
pub async fn transition_sample(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
    Json(body): Json<TransitionBody>,
) -> AppResult<Json<DataResponse<TransitionResponse>>> {
    let request = build_request(&user, body)?;
    let outcome = RoutingRepo::transition_sample(&state.pool, order_id, &request).await?;
    Ok(Json(DataResponse {
        data: finish(&state, &user, outcome),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_request(user: &AuthUser, body: TransitionBody) -> AppResult<TransitionRequest> {
    let action = RouteAction::from_parts(&body.action, body.destination.as_deref())?;
    Ok(TransitionRequest {
        actor_id: user.user_id,
        actor_role: user.role,
        action,
        expected_version: body.expected_version,
        note: body.note.filter(|n| !n.trim().is_empty()),
    })
}

/// Publish the committed transition and shape the response for the caller.
fn finish(state: &AppState, user: &AuthUser, outcome: TransitionOutcome) -> TransitionResponse {
    let plan = &outcome.plan;
    tracing::info!(
        user_id = user.user_id,
        order_id = outcome.order.id,
        product_id = ?outcome.product.as_ref().map(|p| p.id),
        action = plan.action.as_str(),
        from_holder = %plan.from.holder,
        to_holder = %plan.to.holder,
        to_status = %plan.to.stage,
        "Routing transition applied"
    );

    let mut event = OrderEvent::new(plan.audit_action(), outcome.order.id, outcome.message.clone())
        .with_actor(user.user_id)
        .with_recipients(outcome.recipients.clone())
        .with_payload(json!({
            "action": plan.action.as_str(),
            "destination": plan.action.destination().map(Role::as_str),
            "holder": plan.to.holder.as_str(),
            "status": plan.to.stage.as_str(),
            "order_status_change": outcome
                .order_status_change
                .map(|(from, to)| json!({ "from": from.as_str(), "to": to.as_str() })),
        }));
    if let Some(product) = &outcome.product {
        event = event.with_product(product.id);
    }
    if !event.recipients.is_empty() {
        state.publish(event);
    }

    TransitionResponse {
        message: outcome.message,
        order_status: outcome.order.status.clone(),
        product: outcome.product.map(|p| p.redacted_for(user.role)),
        order: outcome.order.redacted_for(user.role),
    }
}
