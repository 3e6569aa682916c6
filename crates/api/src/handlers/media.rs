//! Handlers for order media: multipart upload, listing, download, delete.
//!
//! Files are written under the configured media root at
//! `orders/<order_id>/<uuid>.<ext>`; the row in `order_media` records the
//! sanitized original name and the content type served on download.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::media::{storage_path, validate_upload, MediaKind};
use orderflow_core::types::DbId;
use orderflow_db::models::audit::NewAuditEntry;
use orderflow_db::models::media::{CreateMedia, OrderMedia};
use orderflow_db::repositories::{AuditLogRepo, MediaRepo, OrderRepo, ProductRepo};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::access::{ensure_open, visible_order};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MediaListParams {
    pub product_id: Option<DbId>,
}

/// The parts of an upload form.
struct UploadForm {
    kind: Option<String>,
    product_id: Option<DbId>,
    file_name: Option<String>,
    bytes: Option<Vec<u8>>,
}

async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm {
        kind: None,
        product_id: None,
        file_name: None,
        bytes: None,
    };
    let bad = |e: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("Invalid multipart body: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        match field.name() {
            Some("kind") => form.kind = Some(field.text().await.map_err(bad)?),
            Some("product_id") => {
                let raw = field.text().await.map_err(bad)?;
                let id = raw.trim().parse::<DbId>().map_err(|_| {
                    AppError::BadRequest(format!("product_id '{raw}' is not a valid id"))
                })?;
                form.product_id = Some(id);
            }
            Some("file") => {
                form.file_name = field.file_name().map(str::to_string);
                form.bytes = Some(field.bytes().await.map_err(bad)?.to_vec());
            }
            _ => {}
        }
    }
    Ok(form)
}

/// GET /api/v1/orders/{id}/media
pub async fn list_media(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
    Query(params): Query<MediaListParams>,
) -> AppResult<Json<DataResponse<Vec<OrderMedia>>>> {
    visible_order(&state.pool, &user, order_id).await?;
    let data = MediaRepo::list_by_order(&state.pool, order_id, params.product_id).await?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/orders/{id}/media
///
/// Multipart form with `kind`, an optional `product_id` and the `file`.
pub async fn upload_media(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<OrderMedia>>)> {
    let order = visible_order(&state.pool, &user, order_id).await?;
    ensure_open(&order)?;

    let form = read_form(multipart).await?;
    let kind = MediaKind::parse(
        form.kind
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Missing 'kind' field".into()))?,
    )?;
    if !kind.uploadable_by(user.role) {
        return Err(CoreError::Forbidden(format!(
            "A {} cannot upload {} media",
            user.role,
            kind.as_str()
        ))
        .into());
    }
    if let Some(product_id) = form.product_id {
        let belongs = ProductRepo::find_by_id(&state.pool, product_id)
            .await?
            .is_some_and(|p| p.order_id == order_id);
        if !belongs {
            return Err(CoreError::Validation(format!(
                "Product {product_id} does not belong to order {order_id}"
            ))
            .into());
        }
    }

    let bytes = form
        .bytes
        .ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;
    let file_name = form.file_name.unwrap_or_default();
    let check = validate_upload(&file_name, bytes.len() as u64, state.config.media_max_bytes)?;

    let token = Uuid::new_v4().simple().to_string();
    let relative = storage_path(order_id, &token, &check.extension);
    let full_path = state.config.media_root.join(&relative);
    if let Some(parent) = full_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to create media directory: {e}")))?;
    }
    tokio::fs::write(&full_path, &bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store upload: {e}")))?;

    let created = MediaRepo::create(
        &state.pool,
        &CreateMedia {
            order_id,
            product_id: form.product_id,
            media_kind: kind.as_str().to_string(),
            original_name: check.original_name,
            stored_path: relative,
            content_type: check.content_type.to_string(),
            size_bytes: bytes.len() as i64,
            uploaded_by: user.user_id,
        },
    )
    .await;
    let media = match created {
        Ok(media) => media,
        Err(e) => {
            if let Err(io) = tokio::fs::remove_file(&full_path).await {
                tracing::warn!(error = %io, path = %full_path.display(), "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(
            user.user_id,
            action_types::MEDIA_UPLOAD,
            entity_types::MEDIA,
            media.id,
        )
        .order(order_id)
        .details(json!({
            "kind": media.media_kind,
            "original_name": media.original_name,
            "size_bytes": media.size_bytes,
        })),
    )
    .await?;

    tracing::info!(
        user_id = user.user_id,
        order_id,
        media_id = media.id,
        kind = kind.as_str(),
        size_bytes = media.size_bytes,
        "Media uploaded"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: media })))
}

/// GET /api/v1/media/{id}/download
pub async fn download_media(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let media = find_visible(&state, &user, id).await?;
    let full_path = state.config.media_root.join(&media.stored_path);
    let bytes = match tokio::fs::read(&full_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(media_id = id, path = %full_path.display(), "Media file missing on disk");
            return Err(CoreError::not_found("Media", id).into());
        }
        Err(e) => return Err(AppError::InternalError(format!("Failed to read media: {e}"))),
    };

    let disposition = format!("attachment; filename=\"{}\"", media.original_name);
    Ok((
        [
            (header::CONTENT_TYPE, media.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /api/v1/media/{id}
///
/// Admins may delete any media; other users only what they uploaded.
pub async fn delete_media(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let media = find_visible(&state, &user, id).await?;
    if !user.is_admin() && media.uploaded_by != user.user_id {
        return Err(
            CoreError::Forbidden("Only the uploader or an admin may delete media".into()).into(),
        );
    }

    let deleted = MediaRepo::delete(&state.pool, id)
        .await?
        .ok_or(CoreError::not_found("Media", id))?;

    let full_path = state.config.media_root.join(&deleted.stored_path);
    if let Err(e) = tokio::fs::remove_file(&full_path).await {
        tracing::warn!(error = %e, media_id = id, path = %full_path.display(), "Failed to remove media file");
    }

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(user.user_id, action_types::MEDIA_DELETE, entity_types::MEDIA, id)
            .order(deleted.order_id)
            .details(json!({ "original_name": deleted.original_name })),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The media row, if its order is visible to `user`. Reported as missing
/// otherwise.
async fn find_visible(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<OrderMedia> {
    let not_found = || CoreError::not_found("Media", id);
    let media = MediaRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    let visible = OrderRepo::find_by_id(&state.pool, media.order_id)
        .await?
        .is_some_and(|order| order.visible_to(user.role, user.user_id));
    if !visible {
        return Err(not_found().into());
    }
    Ok(media)
}
