// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin grant management.

use chrono::Utc;
use tracing::info;

use super::{canonical_subject, AccountError};
use crate::storage::{AdminGrantRecord, Snapshot, Store};

/// Flag values to set. `None` leaves a flag unchanged on update and
/// defaults it to `true` on creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantChanges {
    pub can_manage_content: Option<bool>,
    pub can_manage_users: Option<bool>,
    pub can_moderate: Option<bool>,
}

pub struct GrantManager<'a> {
    store: &'a Store,
    subject_prefix: &'a str,
}

impl<'a> GrantManager<'a> {
    pub fn new(store: &'a Store, subject_prefix: &'a str) -> Self {
        Self {
            store,
            subject_prefix,
        }
    }

    pub fn list(&self) -> Result<Vec<AdminGrantRecord>, AccountError> {
        Ok(self.store.read(|tx| tx.admin_grants())?)
    }

    pub fn get(&self, account_id: &str) -> Result<AdminGrantRecord, AccountError> {
        let account_id = canonical_subject(account_id, self.subject_prefix);
        self.store
            .read(|tx| tx.admin_grant(&account_id))?
            .ok_or_else(|| not_found(&account_id))
    }

    /// Grant admin permissions to an active account without one.
    pub fn create(
        &self,
        account_id: &str,
        changes: GrantChanges,
    ) -> Result<AdminGrantRecord, AccountError> {
        let account_id = canonical_subject(account_id, self.subject_prefix);
        let grant = self.store.write(|tx| {
            let active = tx.account(&account_id)?.is_some_and(|a| !a.is_deleted());
            if !active {
                return Err(AccountError::NotFound(format!(
                    "Account {account_id} not found or deactivated"
                )));
            }
            if tx.admin_grant(&account_id)?.is_some() {
                return Err(AccountError::Conflict(format!(
                    "Account {account_id} already has admin permissions"
                )));
            }

            let grant = AdminGrantRecord::new(
                account_id.clone(),
                changes.can_manage_content.unwrap_or(true),
                changes.can_manage_users.unwrap_or(true),
                changes.can_moderate.unwrap_or(true),
            );
            tx.put_admin_grant(&grant)?;
            Ok(grant)
        })?;

        info!(account_id = %grant.account_id, "Admin permissions granted");
        Ok(grant)
    }

    /// Change some flags of an existing grant.
    pub fn update(
        &self,
        account_id: &str,
        changes: GrantChanges,
    ) -> Result<AdminGrantRecord, AccountError> {
        let account_id = canonical_subject(account_id, self.subject_prefix);
        self.store.write(|tx| {
            let mut grant = tx
                .admin_grant(&account_id)?
                .ok_or_else(|| not_found(&account_id))?;
            if let Some(value) = changes.can_manage_content {
                grant.can_manage_content = value;
            }
            if let Some(value) = changes.can_manage_users {
                grant.can_manage_users = value;
            }
            if let Some(value) = changes.can_moderate {
                grant.can_moderate = value;
            }
            grant.updated_at = Utc::now();
            tx.put_admin_grant(&grant)?;
            Ok(grant)
        })
    }

    pub fn delete(&self, account_id: &str) -> Result<(), AccountError> {
        let account_id = canonical_subject(account_id, self.subject_prefix);
        self.store.write(|tx| {
            if tx.delete_admin_grant(&account_id)? {
                Ok(())
            } else {
                Err(not_found(&account_id))
            }
        })?;
        info!(account_id = %account_id, "Admin permissions revoked");
        Ok(())
    }
}

fn not_found(account_id: &str) -> AccountError {
    AccountError::NotFound(format!("No admin permissions for account {account_id}"))
}
