//! Client/admin note threads.
//!
//! Notes are a private channel between the admins and the order's client;
//! manufacturers never see them.

use crate::roles::Role;
use crate::types::DbId;

/// Maximum length of a note body in characters.
pub const MAX_NOTE_BODY_LENGTH: usize = 5_000;

/// Validate a note body: non-blank and within the length limit.
pub fn validate_note_body(body: &str) -> Result<(), String> {
    if body.trim().is_empty() {
        return Err("Note body cannot be empty".to_string());
    }
    if body.chars().count() > MAX_NOTE_BODY_LENGTH {
        return Err(format!(
            "Note body exceeds maximum length of {MAX_NOTE_BODY_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Whether `role` may read or write notes on an order it can already see.
pub fn can_access_notes(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Client)
}

/// Admins may delete any note; clients only their own.
pub fn can_delete_note(role: Role, user_id: DbId, author_id: DbId) -> bool {
    match role {
        Role::Admin => true,
        Role::Client => user_id == author_id,
        Role::Manufacturer => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_body_rejected() {
        assert!(validate_note_body("  \n").is_err());
        assert!(validate_note_body("Please use the darker navy").is_ok());
    }

    #[test]
    fn long_body_rejected() {
        let body = "a".repeat(MAX_NOTE_BODY_LENGTH + 1);
        assert!(validate_note_body(&body).unwrap_err().contains("maximum length"));
    }

    #[test]
    fn manufacturers_excluded() {
        assert!(can_access_notes(Role::Admin));
        assert!(can_access_notes(Role::Client));
        assert!(!can_access_notes(Role::Manufacturer));
    }

    #[test]
    fn delete_rights() {
        assert!(can_delete_note(Role::Admin, 1, 9));
        assert!(can_delete_note(Role::Client, 9, 9));
        assert!(!can_delete_note(Role::Client, 8, 9));
        assert!(!can_delete_note(Role::Manufacturer, 9, 9));
    }
}
