//! Audit log constants and helpers.
//!
//! Entries are append-only and chained: each entry's integrity hash covers the
//! previous entry's hash, so editing or deleting a row breaks every hash after
//! it. [`verify_chain`] recomputes the chain from the seed.

use crate::hashing;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Action type constants
// ---------------------------------------------------------------------------

/// Known action types for audit log entries.
///
/// Routing transitions use `<entity>.<action>` (see
/// [`TransitionPlan::audit_action`](crate::routing::TransitionPlan::audit_action))
/// and are not listed here.
pub mod action_types {
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const USER_CREATE: &str = "user_create";
    pub const ORDER_CREATE: &str = "order_create";
    pub const ORDER_UPDATE: &str = "order_update";
    pub const ORDER_DELETE: &str = "order_delete";
    pub const ORDER_SUBMIT: &str = "order_submit";
    pub const ORDER_CANCEL: &str = "order_cancel";
    pub const ORDER_STATUS_CHANGE: &str = "order_status_change";
    pub const MANUFACTURER_ASSIGN: &str = "manufacturer_assign";
    pub const SAMPLE_UPDATE: &str = "sample_update";
    pub const PRODUCT_CREATE: &str = "product_create";
    pub const PRODUCT_UPDATE: &str = "product_update";
    pub const PRODUCT_DELETE: &str = "product_delete";
    pub const PRICING_UPDATE: &str = "pricing_update";
    pub const ITEM_CREATE: &str = "item_create";
    pub const ITEM_UPDATE: &str = "item_update";
    pub const ITEM_DELETE: &str = "item_delete";
    pub const ACCESSORY_CREATE: &str = "accessory_create";
    pub const ACCESSORY_UPDATE: &str = "accessory_update";
    pub const ACCESSORY_DELETE: &str = "accessory_delete";
    pub const MEDIA_UPLOAD: &str = "media_upload";
    pub const MEDIA_DELETE: &str = "media_delete";
    pub const NOTE_CREATE: &str = "note_create";
    pub const NOTE_DELETE: &str = "note_delete";
}

/// Entity type labels stored in `audit_logs.entity_type`.
pub mod entity_types {
    pub const USER: &str = "user";
    pub const ORDER: &str = "order";
    pub const PRODUCT: &str = "product";
    pub const SAMPLE: &str = "sample";
    pub const ITEM: &str = "item";
    pub const ACCESSORY: &str = "accessory";
    pub const MEDIA: &str = "media";
    pub const NOTE: &str = "note";
}

// ---------------------------------------------------------------------------
// Integrity hash chain
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "AUDIT_LOG_CHAIN_SEED_V1";

/// Canonical string covered by an entry's integrity hash.
///
/// The timestamp is left out: it is assigned by the database after the hash
/// has been computed.
pub fn canonical_entry_data(
    action_type: &str,
    entity_type: &str,
    entity_id: Option<DbId>,
    user_id: Option<DbId>,
    details: &serde_json::Value,
) -> String {
    let entity = entity_id.map(|id| id.to_string()).unwrap_or_default();
    let user = user_id.map(|id| id.to_string()).unwrap_or_default();
    format!("{action_type}|{entity_type}|{entity}|{user}|{details}")
}

/// Compute the SHA-256 integrity hash for an audit log entry.
///
/// `prev_hash` is the hash of the previous entry, or `None` for the first
/// entry in the chain.
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let combined = format!("{prev}|{entry_data}");
    hashing::sha256_hex(combined.as_bytes())
}

/// Minimal view of a stored entry needed to verify the chain.
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub id: DbId,
    pub entry_data: String,
    pub integrity_hash: String,
}

/// Result of recomputing the chain over entries in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChainVerification {
    pub entries_checked: usize,
    pub valid: bool,
    /// Id of the first entry whose stored hash does not match.
    pub first_broken_id: Option<DbId>,
}

/// Recompute hashes from the seed and compare with the stored ones.
pub fn verify_chain(links: &[ChainLink]) -> ChainVerification {
    let mut prev: Option<&str> = None;
    for link in links {
        let expected = compute_integrity_hash(prev, &link.entry_data);
        if expected != link.integrity_hash {
            return ChainVerification {
                entries_checked: links.len(),
                valid: false,
                first_broken_id: Some(link.id),
            };
        }
        prev = Some(&link.integrity_hash);
    }
    ChainVerification {
        entries_checked: links.len(),
        valid: true,
        first_broken_id: None,
    }
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Keys whose values never reach `audit_logs.details`.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "credential",
];

/// Replace the value of any key containing a [`SENSITIVE_FIELDS`] entry with
/// `"[REDACTED]"`, recursing into objects and arrays.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(key.clone(), serde_json::Value::from("[REDACTED]"));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}
