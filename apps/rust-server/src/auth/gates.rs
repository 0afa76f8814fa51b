// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role and permission gates.
//!
//! Both operate on the account resolved earlier in the request and never
//! touch the store.

use tracing::warn;

use super::error::AuthError;
use super::policy::Permission;
use super::roles::Role;
use crate::accounts::ResolvedAccount;

/// Allow when no roles are declared or the account's role is listed.
/// An account without a role never matches a non-empty set.
pub fn role_gate(account: &ResolvedAccount, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.is_empty() {
        return Ok(());
    }
    match account.role_name() {
        Some(name) if allowed.iter().any(|r| r.as_str() == name) => Ok(()),
        _ => Err(AuthError::RoleNotAllowed),
    }
}

/// Require an elevated role, an admin grant, and every listed flag.
pub fn permission_gate(account: &ResolvedAccount, required: &[Permission]) -> Result<(), AuthError> {
    if required.is_empty() {
        return Ok(());
    }
    if !account.is_elevated() {
        return Err(AuthError::InsufficientRole);
    }
    let Some(grant) = &account.grant else {
        return Err(AuthError::PermissionsNotConfigured);
    };
    if let Some(missing) = required.iter().find(|p| !p.is_granted_by(grant)) {
        warn!(
            account_id = %account.id(),
            permission = %missing,
            "Admin grant lacks required permission"
        );
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(())
}
