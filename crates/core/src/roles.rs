//! Role names and the [`Role`] enum.
//!
//! The constants must match the seed data in
//! `20261001000001_create_roles_and_users.sql`. A role doubles as a routing
//! holder: the `routed_to` column of products and samples stores one of
//! these names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANUFACTURER: &str = "manufacturer";
pub const ROLE_CLIENT: &str = "client";

/// Seeded `roles.id` values.
pub const ROLE_ID_ADMIN: i64 = 1;
pub const ROLE_ID_MANUFACTURER: i64 = 2;
pub const ROLE_ID_CLIENT: i64 = 3;

/// A party in the production workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manufacturer,
    Client,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manufacturer, Role::Client];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Manufacturer => ROLE_MANUFACTURER,
            Role::Client => ROLE_CLIENT,
        }
    }

    /// Parse a stored role name.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_MANUFACTURER => Ok(Role::Manufacturer),
            ROLE_CLIENT => Ok(Role::Client),
            other => Err(CoreError::Validation(format!(
                "Unknown role '{other}'. Must be one of: {ROLE_ADMIN}, {ROLE_MANUFACTURER}, {ROLE_CLIENT}"
            ))),
        }
    }

    /// The seeded `roles.id` for this role.
    pub fn id(self) -> i64 {
        match self {
            Role::Admin => ROLE_ID_ADMIN,
            Role::Manufacturer => ROLE_ID_MANUFACTURER,
            Role::Client => ROLE_ID_CLIENT,
        }
    }

    /// Map a seeded `roles.id` back to its role.
    pub fn from_id(id: i64) -> Result<Self, CoreError> {
        Role::ALL
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| CoreError::Internal(format!("Unknown role id {id}")))
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
