// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privileged account bootstrap.
//!
//! Ensures the configured account exists as an active superadmin with a
//! full admin grant. Runs in one transaction and converges: a second run
//! changes nothing.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

use super::readiness::Readiness;
use super::{canonical_subject, AccountError};
use crate::auth::roles::Role;
use crate::config::BootstrapSettings;
use crate::storage::{AccountRecord, AdminGrantRecord, Snapshot, Store, WriteTx};

/// Roles the bootstrap account depends on.
const REQUIRED_ROLES: [Role; 3] = [Role::BASELINE, Role::SuperAdmin, Role::Admin];

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A business rule rejected the reconciliation (e.g. email taken)
    #[error(transparent)]
    Account(AccountError),

    #[error("Privileged account initialization failed: {0}")]
    Initialization(String),
}

impl From<AccountError> for BootstrapError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Store(e) => BootstrapError::Initialization(e.to_string()),
            AccountError::Internal(msg) => BootstrapError::Initialization(msg),
            other => BootstrapError::Account(other),
        }
    }
}

/// What a bootstrap run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub roles_created: usize,
    pub account_created: bool,
    pub account_updated: bool,
    pub grant_created: bool,
    pub grant_updated: bool,
}

impl BootstrapReport {
    pub fn is_noop(&self) -> bool {
        *self == BootstrapReport::default()
    }
}

pub struct Bootstrapper<'a> {
    store: &'a Store,
    settings: &'a BootstrapSettings,
    subject: String,
}

impl<'a> Bootstrapper<'a> {
    /// `subject_prefix` qualifies a bare configured subject the same way
    /// incoming token subjects are qualified.
    pub fn new(store: &'a Store, settings: &'a BootstrapSettings, subject_prefix: &str) -> Self {
        Self {
            store,
            settings,
            subject: canonical_subject(&settings.subject, subject_prefix),
        }
    }

    /// Canonical id of the bootstrap account.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        Ok(self.store.write(|tx| self.reconcile(tx))?)
    }

    fn reconcile(&self, tx: &WriteTx) -> Result<BootstrapReport, AccountError> {
        let mut report = BootstrapReport::default();

        for role in REQUIRED_ROLES {
            if tx.role_by_name(role.as_str())?.is_none() {
                tx.insert_role(role.as_str())?;
                report.roles_created += 1;
            }
        }
        let superadmin = tx
            .role_by_name(Role::SuperAdmin.as_str())?
            .ok_or_else(|| AccountError::Internal("superadmin role missing after seeding".into()))?;

        let subject = self.subject.as_str();
        let email = self.settings.email.trim();
        let name = self.settings.name.trim();
        let now = Utc::now();

        match tx.account(subject)? {
            None => {
                ensure_email_free(tx, email, subject)?;
                tx.put_account(&AccountRecord {
                    id: subject.to_string(),
                    name: name.to_string(),
                    email: email.to_string(),
                    picture: None,
                    email_verified: true,
                    blocked: false,
                    role_id: Some(superadmin.id),
                    last_login_at: None,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                })?;
                report.account_created = true;
            }
            Some(mut account) => {
                let mut changed = false;
                if account.deleted_at.is_some() {
                    account.deleted_at = None;
                    changed = true;
                }
                if account.blocked {
                    account.blocked = false;
                    changed = true;
                }
                if account.role_id != Some(superadmin.id) {
                    account.role_id = Some(superadmin.id);
                    changed = true;
                }
                if account.name != name {
                    account.name = name.to_string();
                    changed = true;
                }
                if account.email != email {
                    ensure_email_free(tx, email, subject)?;
                    account.email = email.to_string();
                    changed = true;
                }
                if changed {
                    account.updated_at = now;
                    tx.put_account(&account)?;
                    report.account_updated = true;
                }
            }
        }

        match tx.admin_grant(subject)? {
            None => {
                tx.put_admin_grant(&AdminGrantRecord::new(subject, true, true, true))?;
                report.grant_created = true;
            }
            Some(mut grant) if !grant.has_all() => {
                grant.can_manage_content = true;
                grant.can_manage_users = true;
                grant.can_moderate = true;
                grant.updated_at = now;
                tx.put_admin_grant(&grant)?;
                report.grant_updated = true;
            }
            Some(_) => {}
        }

        Ok(report)
    }
}

fn ensure_email_free(tx: &WriteTx, email: &str, subject: &str) -> Result<(), AccountError> {
    match tx.account_id_by_email(email)? {
        Some(owner) if owner != subject => Err(AccountError::Conflict(format!(
            "Email {email} already belongs to account {owner}"
        ))),
        _ => Ok(()),
    }
}

/// Wait for the store to become ready, then run the bootstrap once.
pub async fn run_when_ready(
    store: Arc<Store>,
    settings: BootstrapSettings,
    subject_prefix: String,
    readiness: Readiness,
) {
    readiness.wait().await;
    let bootstrapper = Bootstrapper::new(&store, &settings, &subject_prefix);
    let subject = bootstrapper.subject();
    match bootstrapper.run() {
        Ok(report) if report.is_noop() => {
            info!(subject, "Privileged account already up to date");
        }
        Ok(report) => {
            info!(subject, ?report, "Privileged account reconciled");
        }
        Err(e) => {
            error!(subject, error = %e, "Privileged account bootstrap failed");
        }
    }
}
