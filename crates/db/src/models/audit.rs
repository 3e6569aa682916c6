//! Audit log entity models and DTOs.
//!
//! Audit logs are immutable records and have no `updated_at`.

use orderflow_core::audit::canonical_entry_data;
use orderflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single audit log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub timestamp: Timestamp,
    pub user_id: Option<DbId>,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub order_id: Option<DbId>,
    pub details_json: serde_json::Value,
    pub integrity_hash: String,
}

impl AuditLog {
    /// The string this entry's integrity hash covers.
    pub fn canonical_data(&self) -> String {
        canonical_entry_data(
            &self.action_type,
            &self.entity_type,
            self.entity_id,
            self.user_id,
            &self.details_json,
        )
    }
}

/// An entry to append. The hash is computed by the repository.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<DbId>,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Option<DbId>,
    pub order_id: Option<DbId>,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    pub fn new(
        user_id: DbId,
        action_type: impl Into<String>,
        entity_type: &str,
        entity_id: DbId,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            action_type: action_type.into(),
            entity_type: entity_type.to_string(),
            entity_id: Some(entity_id),
            order_id: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn order(mut self, order_id: DbId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Filter parameters for querying audit logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<DbId>,
    pub action_type: Option<String>,
    pub entity_type: Option<String>,
    pub order_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated response for audit log queries.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogPage {
    pub items: Vec<AuditLog>,
    pub total: i64,
}
