use axum::routing::put;
use axum::Router;

use crate::handlers::items;
use crate::state::AppState;

/// Routes mounted at `/items`.
///
/// ```text
/// PUT    /{id}  -> update_item
/// DELETE /{id}  -> delete_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(items::update_item).delete(items::delete_item))
}
