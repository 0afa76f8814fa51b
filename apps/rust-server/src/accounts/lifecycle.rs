// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account lifecycle: create, update, soft-delete, reactivate, first login.

use chrono::Utc;
use tracing::{info, warn};

use super::{canonical_subject, load_resolved, AccountError, ResolvedAccount};
use crate::auth::claims::VerifiedToken;
use crate::auth::roles::Role;
use crate::storage::{AccountRecord, Snapshot, Store, WriteTx};

/// Input for an explicit provisioning call.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Subject identifier, bare or provider-prefixed
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub email_verified: bool,
    /// Requested role; the baseline role is used when absent
    pub role_id: Option<u64>,
}

/// Mutable account fields. Identifier, email and deletion state are not here.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub picture: Option<String>,
    pub blocked: Option<bool>,
    pub role_id: Option<u64>,
}

/// Result of reconciling a verified login with the stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Created(ResolvedAccount),
    Returning(ResolvedAccount),
    Deactivated,
    Blocked,
}

/// Account lifecycle operations over a store.
pub struct AccountLifecycle<'a> {
    store: &'a Store,
    subject_prefix: &'a str,
}

impl<'a> AccountLifecycle<'a> {
    pub fn new(store: &'a Store, subject_prefix: &'a str) -> Self {
        Self {
            store,
            subject_prefix,
        }
    }

    pub fn canonical_id(&self, raw: &str) -> String {
        canonical_subject(raw, self.subject_prefix)
    }

    /// Provision a new account.
    ///
    /// Fails with a conflict when the id or email is taken, noting whether
    /// the existing account is deactivated.
    pub fn create(&self, input: NewAccount) -> Result<ResolvedAccount, AccountError> {
        let id = self.canonical_id(&input.id);
        if id.is_empty() {
            return Err(AccountError::Validation("Account id must not be empty".into()));
        }
        let name = non_empty(&input.name, "name")?;
        let email = input.email.trim().to_string();
        if !email.contains('@') {
            return Err(AccountError::Validation(format!("Invalid email address: {email}")));
        }

        self.store.write(|tx| {
            if let Some(existing) = tx.account(&id)? {
                return Err(AccountError::Conflict(duplicate_message(
                    &format!("Account {id}"),
                    existing.is_deleted(),
                )));
            }
            if let Some(owner_id) = tx.account_id_by_email(&email)? {
                let owner_deleted = tx.account(&owner_id)?.is_some_and(|a| a.is_deleted());
                return Err(AccountError::Conflict(duplicate_message(
                    &format!("Email {email}"),
                    owner_deleted,
                )));
            }

            let role_id = resolve_role_for_create(tx, input.role_id)?;
            let now = Utc::now();
            tx.put_account(&AccountRecord {
                id: id.clone(),
                name,
                email,
                picture: input.picture,
                email_verified: input.email_verified,
                blocked: false,
                role_id,
                last_login_at: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })?;
            Ok(())
        })?;

        info!(account_id = %id, "Account created");
        self.reread(&id)
    }

    /// Load an active account.
    pub fn get(&self, id: &str) -> Result<ResolvedAccount, AccountError> {
        let id = self.canonical_id(id);
        self.store
            .read(|tx| load_resolved(tx, &id))?
            .filter(|r| !r.account.is_deleted())
            .ok_or_else(|| not_found(&id))
    }

    /// All active accounts.
    pub fn list(&self) -> Result<Vec<ResolvedAccount>, AccountError> {
        self.store.read(|tx| {
            let mut resolved = Vec::new();
            for account in tx.accounts()? {
                if account.is_deleted() {
                    continue;
                }
                if let Some(r) = load_resolved(tx, &account.id)? {
                    resolved.push(r);
                }
            }
            Ok(resolved)
        })
    }

    /// Update an active account. A requested role is checked before any
    /// field changes.
    pub fn update(&self, id: &str, update: AccountUpdate) -> Result<ResolvedAccount, AccountError> {
        let id = self.canonical_id(id);
        self.store.write(|tx| {
            let mut account = tx
                .account(&id)?
                .filter(|a| !a.is_deleted())
                .ok_or_else(|| not_found(&id))?;

            if let Some(role_id) = update.role_id {
                if tx.role(role_id)?.is_none() {
                    return Err(AccountError::NotFound(format!("Role {role_id} not found")));
                }
                account.role_id = Some(role_id);
            }
            if let Some(name) = &update.name {
                account.name = non_empty(name, "name")?;
            }
            if let Some(picture) = update.picture {
                account.picture = Some(picture);
            }
            if let Some(blocked) = update.blocked {
                account.blocked = blocked;
            }

            account.updated_at = Utc::now();
            tx.put_account(&account)?;
            Ok(())
        })?;

        self.reread(&id)
    }

    /// Deactivate an account and revoke its admin grant in one transaction.
    ///
    /// Fails with not-found when the account is missing or already deleted.
    pub fn soft_delete(&self, id: &str) -> Result<(), AccountError> {
        let id = self.canonical_id(id);
        let revoked = self.store.write(|tx| deactivate(tx, &id))?;
        info!(account_id = %id, grant_revoked = revoked, "Account deactivated");
        Ok(())
    }

    /// Clear the deletion timestamp of a deactivated account.
    pub fn reactivate(&self, id: &str) -> Result<ResolvedAccount, AccountError> {
        let id = self.canonical_id(id);
        self.store.write(|tx| {
            let mut account = tx.account(&id)?.ok_or_else(|| not_found(&id))?;
            if !account.is_deleted() {
                return Err(AccountError::InvalidState(format!("Account {id} is already active")));
            }
            account.deleted_at = None;
            account.updated_at = Utc::now();
            tx.put_account(&account)?;
            Ok(())
        })?;

        info!(account_id = %id, "Account reactivated");
        self.reread(&id)
    }

    /// Reconcile a verified login: provision on first sight, otherwise
    /// stamp the login time.
    pub fn sync_login(&self, token: &VerifiedToken) -> Result<LoginOutcome, AccountError> {
        let id = self.canonical_id(&token.subject);
        let existing = self.store.read(|tx| tx.account(&id))?;

        match existing {
            Some(account) if account.is_deleted() => Ok(LoginOutcome::Deactivated),
            Some(account) if account.blocked => Ok(LoginOutcome::Blocked),
            Some(_) => {
                self.touch_login(&id)?;
                Ok(LoginOutcome::Returning(self.reread(&id)?))
            }
            None => {
                let email = token.claims.email.clone().ok_or_else(|| {
                    AccountError::Validation("Token carries no email claim".into())
                })?;
                let name = token.display_name().unwrap_or_else(|| email.clone());
                self.create(NewAccount {
                    id: id.clone(),
                    name,
                    email,
                    picture: token.claims.picture.clone(),
                    email_verified: token.claims.email_verified.unwrap_or(false),
                    role_id: None,
                })?;
                self.touch_login(&id)?;
                Ok(LoginOutcome::Created(self.reread(&id)?))
            }
        }
    }

    fn touch_login(&self, id: &str) -> Result<(), AccountError> {
        self.store.write(|tx| {
            let mut account = tx.account(id)?.ok_or_else(|| not_found(id))?;
            let now = Utc::now();
            account.last_login_at = Some(now);
            account.updated_at = now;
            tx.put_account(&account)?;
            Ok(())
        })
    }

    fn reread(&self, id: &str) -> Result<ResolvedAccount, AccountError> {
        self.store
            .read(|tx| load_resolved(tx, id))?
            .ok_or_else(|| AccountError::Internal(format!("Account {id} missing after write")))
    }
}

/// Soft-delete steps. Returns whether a grant was revoked.
pub(crate) fn deactivate(tx: &WriteTx, id: &str) -> Result<bool, AccountError> {
    if !tx.mark_account_deleted(id, Utc::now())? {
        return Err(not_found(id));
    }
    Ok(tx.delete_admin_grant(id)?)
}

fn resolve_role_for_create(tx: &WriteTx, requested: Option<u64>) -> Result<Option<u64>, AccountError> {
    if let Some(role_id) = requested {
        return match tx.role(role_id)? {
            Some(role) => Ok(Some(role.id)),
            None => Err(AccountError::NotFound(format!("Role {role_id} not found"))),
        };
    }
    match tx.role_by_name(Role::BASELINE.as_str())? {
        Some(role) => Ok(Some(role.id)),
        None => {
            warn!(role = Role::BASELINE.as_str(), "Baseline role missing, creating account without a role");
            Ok(None)
        }
    }
}

fn duplicate_message(what: &str, deactivated: bool) -> String {
    if deactivated {
        format!("{what} already exists but is deactivated")
    } else {
        format!("{what} already exists")
    }
}

fn not_found(id: &str) -> AccountError {
    AccountError::NotFound(format!("Account {id} not found"))
}

fn non_empty(value: &str, field: &str) -> Result<String, AccountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
