pub mod accessories;
pub mod admin;
pub mod auth;
pub mod health;
pub mod items;
pub mod media;
pub mod notes;
pub mod notification;
pub mod orders;
pub mod products;

use axum::routing::get;
use axum::Router;

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
///
/// /admin/users                                     list, create (admin only)
/// /admin/audit-logs                                query (admin only)
/// /admin/audit-logs/integrity-check                verify hash chain
///
/// /orders                                          list, create
/// /orders/{id}                                     get, update, delete
/// /orders/{id}/submit | /cancel                    lifecycle (admin)
/// /orders/{id}/manufacturer                        assign (admin)
/// /orders/{id}/summary                             role-projected totals
/// /orders/{id}/history                             audit entries (admin)
/// /orders/{id}/sample                              sample fields (admin)
/// /orders/{id}/sample/routing | /transition        sample routing
/// /orders/{id}/products | /accessories             list, create
/// /orders/{id}/media                               list, upload
/// /orders/{id}/notes                               list, create
///
/// /products/{id}                                   get, update, delete
/// /products/{id}/pricing                           update pricing
/// /products/{id}/routing | /transition             product routing
/// /products/{id}/items                             list, create
/// /items/{id}                                      update, delete
/// /accessories/{id}                                update, delete
/// /media/{id}                                      delete
/// /media/{id}/download                             download
/// /notes/{id}                                      delete
///
/// /inbox                                           items routed to caller
/// /notifications                                   list, read, read-all
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/orders", orders::router(config.media_max_bytes))
        .nest("/products", products::router())
        .nest("/items", items::router())
        .nest("/accessories", accessories::router())
        .nest("/media", media::router())
        .nest("/notes", notes::router())
        .route("/inbox", get(handlers::inbox::list_inbox))
        .nest("/notifications", notification::router())
}
