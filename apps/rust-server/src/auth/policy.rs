// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Declarative route policies.
//!
//! Each protected route is listed in a [`PolicyTable`] keyed by method and
//! matched path template. Routes missing from the table are public.

use std::collections::HashMap;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::AdminGrantRecord;

/// Fine-grained admin permission flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Content,
    User,
    Moderation,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Content => "content",
            Permission::User => "user",
            Permission::Moderation => "moderation",
        }
    }

    /// Whether `grant` has this flag set.
    pub fn is_granted_by(&self, grant: &AdminGrantRecord) -> bool {
        match self {
            Permission::Content => grant.can_manage_content,
            Permission::User => grant.can_manage_users,
            Permission::Moderation => grant.can_moderate,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a protected route requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A valid bearer token; no stored account needed
    Token,
    /// A valid token resolving to an active, unblocked account
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    pub access: Access,
    /// Allowed roles; empty means any role (including none)
    pub roles: &'static [Role],
    /// Required permission flags; empty skips the permission gate
    pub permissions: &'static [Permission],
}

impl RoutePolicy {
    pub const fn token() -> Self {
        Self {
            access: Access::Token,
            roles: &[],
            permissions: &[],
        }
    }

    pub const fn account() -> Self {
        Self {
            access: Access::Account,
            roles: &[],
            permissions: &[],
        }
    }

    pub const fn roles(self, roles: &'static [Role]) -> Self {
        Self { roles, ..self }
    }

    pub const fn permissions(self, permissions: &'static [Permission]) -> Self {
        Self {
            permissions,
            ..self
        }
    }
}

/// Route → policy mapping consulted by the authorization middleware.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    routes: HashMap<(Method, String), RoutePolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the policy for `method` on the path template `path`
    /// (e.g. `/v1/users/{id}`).
    pub fn declare(mut self, method: Method, path: &str, policy: RoutePolicy) -> Self {
        self.routes.insert((method, path.to_string()), policy);
        self
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RoutePolicy> {
        self.routes.get(&(method.clone(), path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
