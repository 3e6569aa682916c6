use axum::routing::put;
use axum::Router;

use crate::handlers::accessories;
use crate::state::AppState;

/// Routes mounted at `/accessories` (admin only).
///
/// ```text
/// PUT    /{id}  -> update_accessory
/// DELETE /{id}  -> delete_accessory
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        put(accessories::update_accessory).delete(accessories::delete_accessory),
    )
}
