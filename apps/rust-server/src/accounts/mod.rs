// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account domain: lifecycle, roles, admin grants, startup provisioning.
//!
//! Every operation runs against the [`Store`](crate::storage::Store) inside
//! a single transaction; multi-step operations commit all-or-nothing.

pub mod bootstrap;
pub mod grants;
pub mod lifecycle;
pub mod readiness;
pub mod roles;

use thiserror::Error;

use crate::auth::roles::Role;
use crate::storage::{AccountRecord, AdminGrantRecord, RoleRecord, Snapshot, StoreError, StoreResult};

pub use bootstrap::{BootstrapError, BootstrapReport, Bootstrapper};
pub use grants::{GrantChanges, GrantManager};
pub use lifecycle::{AccountLifecycle, AccountUpdate, LoginOutcome, NewAccount};
pub use readiness::{open_store_with_backoff, Readiness};
pub use roles::{RoleDeletion, RoleManager};

/// Account domain errors.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Operation not valid for the entity's current state
    #[error("{0}")]
    InvalidState(String),

    /// Caller supplied an unusable value
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An account together with its role and admin grant, read from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub account: AccountRecord,
    pub role: Option<RoleRecord>,
    pub grant: Option<AdminGrantRecord>,
}

impl ResolvedAccount {
    pub fn id(&self) -> &str {
        &self.account.id
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    /// The account's role, when it is one of the well-known roles.
    pub fn well_known_role(&self) -> Option<Role> {
        self.role_name().and_then(Role::from_name)
    }

    pub fn is_elevated(&self) -> bool {
        self.well_known_role().is_some_and(|r| r.is_elevated())
    }
}

/// Load an account with its role and grant, whatever its deletion state.
pub fn load_resolved(tx: &impl Snapshot, id: &str) -> StoreResult<Option<ResolvedAccount>> {
    let Some(account) = tx.account(id)? else {
        return Ok(None);
    };
    let role = match account.role_id {
        Some(role_id) => tx.role(role_id)?,
        None => None,
    };
    let grant = tx.admin_grant(&account.id)?;
    Ok(Some(ResolvedAccount {
        account,
        role,
        grant,
    }))
}

/// Canonical account id for a subject.
///
/// Provider subjects look like `auth0|123`. A bare id is qualified with
/// `prefix`; an id that already carries a provider segment is kept as is.
pub fn canonical_subject(raw: &str, prefix: &str) -> String {
    let raw = raw.trim();
    if raw.contains('|') || prefix.is_empty() {
        raw.to_string()
    } else {
        format!("{prefix}|{raw}")
    }
}
