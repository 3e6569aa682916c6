//! Route definitions for the `/products` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{items, products, routing};
use crate::state::AppState;

/// Routes mounted at `/products`.
///
/// ```text
/// GET    /{id}             -> get_product
/// PUT    /{id}             -> update_product (admin; manufacturer fulfilment fields)
/// DELETE /{id}             -> delete_product (admin)
/// PUT    /{id}/pricing     -> update_pricing
/// GET    /{id}/routing     -> product_routing
/// POST   /{id}/transition  -> transition_product
/// GET    /{id}/items       -> list_items
/// POST   /{id}/items       -> create_item (admin, client)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/{id}/pricing", put(products::update_pricing))
        .route("/{id}/routing", get(routing::product_routing))
        .route("/{id}/transition", post(routing::transition_product))
        .route("/{id}/items", get(items::list_items).post(items::create_item))
}
