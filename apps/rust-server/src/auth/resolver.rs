// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Subject → account resolution.

use tracing::error;

use super::error::AuthError;
use crate::accounts::{canonical_subject, load_resolved, ResolvedAccount};
use crate::storage::Store;

/// Loads the account behind a verified subject and checks it may act.
pub struct IdentityResolver<'a> {
    store: &'a Store,
    subject_prefix: &'a str,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a Store, subject_prefix: &'a str) -> Self {
        Self {
            store,
            subject_prefix,
        }
    }

    /// Resolve `subject` to an active, unblocked account with its role and
    /// grant loaded from a single snapshot.
    pub fn resolve(&self, subject: &str) -> Result<ResolvedAccount, AuthError> {
        let id = canonical_subject(subject, self.subject_prefix);
        let resolved = self
            .store
            .read(|tx| load_resolved(tx, &id))
            .map_err(|e| {
                error!(error = %e, "Failed to load account");
                AuthError::InternalError(e.to_string())
            })?
            .ok_or(AuthError::AccountNotFound)?;

        if resolved.account.is_deleted() {
            return Err(AuthError::AccountDeactivated);
        }
        if resolved.account.blocked {
            return Err(AuthError::AccountBlocked);
        }
        Ok(resolved)
    }
}
