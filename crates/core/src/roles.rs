//! Roles and the acting user.
//!
//! Role names must match the `users.role` check constraint in
//! `20260301000001_create_reference_tables.sql`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub const ROLE_STAFF: &str = "staff";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

/// Closed set of roles an actor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Supervisor,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Staff => ROLE_STAFF,
            Role::Supervisor => ROLE_SUPERVISOR,
            Role::SuperAdmin => ROLE_SUPER_ADMIN,
        }
    }

    /// `Supervisor` and `SuperAdmin` may act on dispositions they neither
    /// created nor hold.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Supervisor | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    /// Accepts the snake_case names plus the legacy display forms
    /// (`"Super Admin"`, `"Supervisor"`, `"Staff"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            ROLE_STAFF => Ok(Role::Staff),
            ROLE_SUPERVISOR => Ok(Role::Supervisor),
            ROLE_SUPER_ADMIN | "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(CoreError::Validation(format!("Unknown role '{s}'"))),
        }
    }
}

/// The user on whose behalf an operation runs.
///
/// Passed explicitly into every lifecycle and linking call; nothing in the
/// core reads the current user from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: DbId, role: Role) -> Self {
        Self { user_id, role }
    }
}
