// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted record types for accounts, roles and admin grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A platform account, keyed by the identity provider's subject identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    /// Canonical provider-prefixed subject (e.g. `auth0|123`)
    pub id: String,
    pub name: String,
    /// Unique across all accounts, including deactivated ones
    pub email: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub blocked: bool,
    /// Role assignment; `None` when no role could be assigned
    #[serde(default)]
    pub role_id: Option<u64>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp; `None` means the account is active
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AccountRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A named role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct RoleRecord {
    /// Generated role identifier
    pub id: u64,
    /// Unique role name
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Elevated capabilities held by a single account.
///
/// Independent of the account's role: the permission gate requires both an
/// elevated role and the relevant flag here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct AdminGrantRecord {
    /// Generated grant identifier
    pub id: Uuid,
    /// Subject of the owning account
    pub account_id: String,
    pub can_manage_content: bool,
    pub can_manage_users: bool,
    pub can_moderate: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminGrantRecord {
    /// Create a grant for `account_id` with the given flags.
    pub fn new(
        account_id: impl Into<String>,
        can_manage_content: bool,
        can_manage_users: bool,
        can_moderate: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.into(),
            can_manage_content,
            can_manage_users,
            can_moderate,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_all(&self) -> bool {
        self.can_manage_content && self.can_manage_users && self.can_moderate
    }
}
