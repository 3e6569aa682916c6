use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::media;
use crate::state::AppState;

/// Routes mounted at `/media`.
///
/// ```text
/// GET    /{id}/download  -> download_media
/// DELETE /{id}           -> delete_media
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/download", get(media::download_media))
        .route("/{id}", delete(media::delete_media))
}
