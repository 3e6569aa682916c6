//! Notification fan-out.
//!
//! [`notify`] writes in-app notifications for an order change and publishes
//! the matching [`OrderEvent`]. [`EmailNotifier`] subscribes to the event
//! bus and mails a copy to every recipient when SMTP is configured.

use std::sync::Arc;

use orderflow_core::roles::ROLE_ID_ADMIN;
use orderflow_core::types::DbId;
use orderflow_db::models::notification::NewNotification;
use orderflow_db::repositories::{NotificationRepo, UserRepo};
use orderflow_db::DbPool;
use orderflow_events::{Mailer, OrderEvent};
use tokio::sync::broadcast;

use crate::error::AppResult;
use crate::state::AppState;

/// Ids of every active admin.
pub async fn admin_ids(state: &AppState) -> AppResult<Vec<DbId>> {
    Ok(UserRepo::active_ids_with_role(&state.pool, ROLE_ID_ADMIN).await?)
}

/// `candidates` without the actor and without duplicates, order preserved.
pub fn recipients_excluding(candidates: &[DbId], actor: Option<DbId>) -> Vec<DbId> {
    let mut out: Vec<DbId> = Vec::with_capacity(candidates.len());
    for id in candidates {
        if Some(*id) != actor && !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// Insert one in-app notification of `kind` per recipient of `event`
/// (the actor excluded) and publish the event for email delivery.
pub async fn notify(state: &AppState, kind: &str, event: OrderEvent) -> AppResult<Vec<DbId>> {
    let recipients = recipients_excluding(&event.recipients, event.actor_user_id);
    if recipients.is_empty() {
        return Ok(recipients);
    }

    let rows: Vec<NewNotification> = recipients
        .iter()
        .map(|user_id| NewNotification {
            user_id: *user_id,
            order_id: Some(event.order_id),
            product_id: event.product_id,
            kind: kind.to_string(),
            message: event.message.clone(),
        })
        .collect();
    NotificationRepo::create_many(&state.pool, &rows).await?;

    tracing::debug!(
        order_id = event.order_id,
        kind,
        recipients = recipients.len(),
        "Notifications created"
    );
    state.publish(event.with_recipients(recipients.clone()));
    Ok(recipients)
}

/// Background task that emails a copy of every published event.
pub struct EmailNotifier {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
}

impl EmailNotifier {
    pub fn new(pool: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        Self { pool, mailer }
    }

    /// Run until the event bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<OrderEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.deliver(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Email notifier lagged, some emails were not sent");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, email notifier shutting down");
                    break;
                }
            }
        }
    }

    /// Send `event` to each recipient. Failures are logged and skipped.
    pub async fn deliver(&self, event: &OrderEvent) {
        if event.recipients.is_empty() {
            return;
        }
        let emails = match UserRepo::emails_for(&self.pool, &event.recipients).await {
            Ok(emails) => emails,
            Err(e) => {
                tracing::warn!(error = %e, event_type = %event.event_type, "Failed to resolve recipient emails");
                return;
            }
        };
        for email in emails {
            if let Err(e) = self.mailer.send(&email, event).await {
                tracing::warn!(
                    error = %e,
                    to = %email,
                    event_type = %event.event_type,
                    "Failed to send notification email"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_and_duplicates_are_dropped() {
        assert_eq!(recipients_excluding(&[3, 1, 3, 2], Some(1)), vec![3, 2]);
        assert_eq!(recipients_excluding(&[4, 4], None), vec![4]);
        assert!(recipients_excluding(&[1], Some(1)).is_empty());
    }
}
