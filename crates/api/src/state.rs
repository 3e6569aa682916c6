use std::sync::Arc;

use orderflow_events::{EventBus, OrderEvent};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: the pool and everything else are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub pool: orderflow_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Committed changes are published here for email delivery.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    pub fn publish(&self, event: OrderEvent) {
        self.event_bus.publish(event);
    }
}
