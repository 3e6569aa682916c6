//! The email notifier resolves recipients to addresses and keeps going when
//! a send fails. Driven by an in-memory mailer.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{post_json_auth, seed_cast, seed_order_with_product};
use orderflow_api::config::ServerConfig;
use orderflow_api::notifications::EmailNotifier;
use orderflow_api::router::build_app_router;
use orderflow_api::state::AppState;
use orderflow_events::{EmailError, EventBus, Mailer, OrderEvent};
use sqlx::PgPool;

/// Records every send; fails for addresses listed in `failing`.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    failing: Vec<String>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to_email: &str, event: &OrderEvent) -> Result<(), EmailError> {
        if self.failing.iter().any(|f| f == to_email) {
            return Err(EmailError::Build("simulated failure".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), event.event_type.clone()));
        Ok(())
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deliver_skips_failures(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let mailer = Arc::new(RecordingMailer {
        failing: vec!["maker@test.com".to_string()],
        ..Default::default()
    });
    let notifier = EmailNotifier::new(pool, mailer.clone());

    let event = OrderEvent::new("order.submit", 1, "Order ORD-2026-000001 was submitted")
        .with_recipients(vec![cast.maker.id, cast.client.id]);
    notifier.deliver(&event).await;

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent, vec![("client@test.com".to_string(), "order.submit".to_string())]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_notifier_stops_when_bus_closes(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let mailer = Arc::new(RecordingMailer::default());
    let bus = EventBus::default();
    let handle = tokio::spawn(EmailNotifier::new(pool, mailer.clone()).run(bus.subscribe()));

    bus.publish(
        OrderEvent::new("note.create", 7, "New note on order ORD-2026-000007")
            .with_recipients(vec![cast.admin.id]),
    );
    drop(bus);
    handle.await.unwrap();

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent, vec![("admin@test.com".to_string(), "note.create".to_string())]);
}

/// A committed change is published with the actor removed from the
/// recipients.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_api_publishes_committed_changes(pool: PgPool) {
    let cast = seed_cast(&pool).await;
    let config: ServerConfig = common::test_config(std::env::temp_dir().join("orderflow-test-media"));
    let bus = Arc::new(EventBus::default());
    let app = build_app_router(
        AppState {
            pool,
            config: Arc::new(config.clone()),
            event_bus: Arc::clone(&bus),
        },
        &config,
    );
    let (order_id, product_id) = seed_order_with_product(&app, &cast).await;

    let mut receiver = bus.subscribe();
    let response = post_json_auth(
        app,
        &format!("/api/v1/products/{product_id}/transition"),
        serde_json::json!({ "action": "route", "destination": "manufacturer", "expected_version": 1 }),
        &cast.admin.token,
    )
    .await;
    assert_eq!(response.status(), 200);

    let event = receiver.try_recv().expect("transition should publish an event");
    assert_eq!(event.order_id, order_id);
    assert_eq!(event.product_id, Some(product_id));
    assert_eq!(event.actor_user_id, Some(cast.admin.id));
    assert_eq!(event.recipients, vec![cast.maker.id]);
    assert_eq!(event.payload["status"], "sent_to_manufacturer");
}
