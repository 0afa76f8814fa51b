// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Well-known role names.
//!
//! Roles are stored records with generated ids, but four names carry meaning
//! for authorization and are seeded at startup.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roles the service knows by name.
///
/// ## Role Semantics
///
/// - `Registered` - baseline role, assigned by default, protected
/// - `Subscribed` - paying reader, protected
/// - `Admin` - elevated; needs an admin grant for permission-gated routes
/// - `SuperAdmin` - elevated; full control including roles and grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Registered,
    Subscribed,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Every well-known role, in seeding order.
    pub const ALL: [Role; 4] = [Role::Registered, Role::Subscribed, Role::Admin, Role::SuperAdmin];

    /// Role assigned when none is requested, and the target of reassignment
    /// when a role is deleted.
    pub const BASELINE: Role = Role::Registered;

    /// Stored role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Registered => "registered",
            Role::Subscribed => "subscribed",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Parse a stored role name (exact match).
    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == name)
    }

    /// Roles that may hold admin grants.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Baseline roles cannot be deleted or renamed.
    pub fn is_protected(&self) -> bool {
        matches!(self, Role::Registered | Role::Subscribed)
    }

    /// Whether `name` is a protected role name.
    pub fn is_protected_name(name: &str) -> bool {
        Role::from_name(name).is_some_and(|r| r.is_protected())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
