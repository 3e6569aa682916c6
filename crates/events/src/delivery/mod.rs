//! External delivery channels for order notifications.
//!
//! In-app notifications are written by the repositories inside the same
//! transaction as the change; this module only pushes copies outside.

pub mod email;
