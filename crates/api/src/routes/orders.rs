//! Route definitions for the `/orders` resource and everything nested under
//! an order.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{accessories, media, notes, orders, products, routing};
use crate::state::AppState;

/// Multipart framing allowance on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Routes mounted at `/orders`.
///
/// ```text
/// GET    /                        -> list_orders (?status=&limit=&offset=)
/// POST   /                        -> create_order (admin, client)
/// GET    /{id}                    -> get_order
/// PUT    /{id}                    -> update_order (admin)
/// DELETE /{id}                    -> delete_order (admin)
/// POST   /{id}/submit             -> submit_order (admin)
/// POST   /{id}/cancel             -> cancel_order (admin)
/// PUT    /{id}/manufacturer       -> assign_manufacturer (admin)
/// GET    /{id}/summary            -> order_summary
/// GET    /{id}/history            -> order_history (admin)
///
/// PUT    /{id}/sample             -> update_sample (admin)
/// GET    /{id}/sample/routing     -> sample_routing
/// POST   /{id}/sample/transition  -> transition_sample
///
/// GET    /{id}/products           -> list_products
/// POST   /{id}/products           -> create_product (admin, client)
/// GET    /{id}/accessories        -> list_accessories
/// POST   /{id}/accessories        -> create_accessory (admin)
/// GET    /{id}/media              -> list_media (?product_id=)
/// POST   /{id}/media              -> upload_media (multipart)
/// GET    /{id}/notes              -> list_notes (admin, client)
/// POST   /{id}/notes              -> create_note (admin, client)
/// ```
pub fn router(media_max_bytes: u64) -> Router<AppState> {
    let upload_limit =
        usize::try_from(media_max_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route(
            "/{id}",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/{id}/submit", post(orders::submit_order))
        .route("/{id}/cancel", post(orders::cancel_order))
        .route("/{id}/manufacturer", put(orders::assign_manufacturer))
        .route("/{id}/summary", get(orders::order_summary))
        .route("/{id}/history", get(orders::order_history))
        // Sample
        .route("/{id}/sample", put(orders::update_sample))
        .route("/{id}/sample/routing", get(routing::sample_routing))
        .route("/{id}/sample/transition", post(routing::transition_sample))
        // Children
        .route(
            "/{id}/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/{id}/accessories",
            get(accessories::list_accessories).post(accessories::create_accessory),
        )
        .route(
            "/{id}/media",
            get(media::list_media)
                .post(media::upload_media)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/{id}/notes", get(notes::list_notes).post(notes::create_note))
}
