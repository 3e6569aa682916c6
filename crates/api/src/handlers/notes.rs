//! Handlers for the private note thread between admins and an order's
//! client. Manufacturers are refused even on orders they can see.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use orderflow_core::audit::{action_types, entity_types};
use orderflow_core::error::CoreError;
use orderflow_core::notes::{can_access_notes, can_delete_note, validate_note_body};
use orderflow_core::roles::Role;
use orderflow_core::types::DbId;
use orderflow_db::models::audit::NewAuditEntry;
use orderflow_db::models::note::{ClientAdminNote, CreateNote};
use orderflow_db::models::notification::kinds;
use orderflow_db::repositories::{AuditLogRepo, NoteRepo, ProductRepo};
use orderflow_events::OrderEvent;
use serde::Deserialize;

use crate::access::visible_order;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::notifications::{admin_ids, notify};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub body: String,
    /// Attach the note to one product of the order.
    pub product_id: Option<DbId>,
}

fn ensure_note_access(user: &AuthUser) -> AppResult<()> {
    if !can_access_notes(user.role) {
        return Err(CoreError::Forbidden(
            "Notes are only shared between admins and the client".into(),
        )
        .into());
    }
    Ok(())
}

/// GET /api/v1/orders/{id}/notes
pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ClientAdminNote>>>> {
    ensure_note_access(&user)?;
    visible_order(&state.pool, &user, order_id).await?;
    let data = NoteRepo::list_by_order(&state.pool, order_id).await?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/orders/{id}/notes
///
/// A client's note notifies every admin; an admin's note notifies the client.
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<DbId>,
    Json(input): Json<CreateNoteRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ClientAdminNote>>)> {
    ensure_note_access(&user)?;
    let order = visible_order(&state.pool, &user, order_id).await?;
    validate_note_body(&input.body).map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    if let Some(product_id) = input.product_id {
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

    let note = NoteRepo::create(
        &state.pool,
        &CreateNote {
            order_id,
            product_id: input.product_id,
            author_id: user.user_id,
            author_role: user.role.as_str().to_string(),
            body: input.body.trim().to_string(),
        },
    )
    .await?;

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(user.user_id, action_types::NOTE_CREATE, entity_types::NOTE, note.id)
            .order(order_id),
    )
    .await?;

    let recipients = match user.role {
        Role::Client => admin_ids(&state).await?,
        _ => vec![order.client_id],
    };
    let mut event = OrderEvent::new(
        "note.create",
        order_id,
        format!("New note on order {}", order.order_number),
    )
    .with_actor(user.user_id)
    .with_recipients(recipients);
    if let Some(product_id) = note.product_id {
        event = event.with_product(product_id);
    }
    notify(&state, kinds::NOTE_ADDED, event).await?;

    tracing::info!(user_id = user.user_id, order_id, note_id = note.id, "Note added");
    Ok((StatusCode::CREATED, Json(DataResponse { data: note })))
}

/// DELETE /api/v1/notes/{id}
pub async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    ensure_note_access(&user)?;
    let not_found = || CoreError::not_found("Note", id);
    let note = NoteRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    visible_order(&state.pool, &user, note.order_id).await?;

    if !can_delete_note(user.role, user.user_id, note.author_id) {
        return Err(
            CoreError::Forbidden("Only the author or an admin may delete a note".into()).into(),
        );
    }
    if !NoteRepo::delete(&state.pool, id).await? {
        return Err(not_found().into());
    }

    AuditLogRepo::record(
        &state.pool,
        &NewAuditEntry::new(user.user_id, action_types::NOTE_DELETE, entity_types::NOTE, id)
            .order(note.order_id),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
