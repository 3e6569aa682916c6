use axum::routing::delete;
use axum::Router;

use crate::handlers::notes;
use crate::state::AppState;

/// Routes mounted at `/notes`.
///
/// ```text
/// DELETE /{id}  -> delete_note
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", delete(notes::delete_note))
}
