// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role management and startup seeding.

use chrono::Utc;
use tracing::info;

use super::AccountError;
use crate::auth::roles::Role;
use crate::storage::{RoleRecord, Snapshot, Store};

/// Outcome of a role deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDeletion {
    pub role: RoleRecord,
    /// Accounts moved to the baseline role
    pub reassigned: usize,
}

pub struct RoleManager<'a> {
    store: &'a Store,
}

impl<'a> RoleManager<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Create every well-known role that is missing. Returns the new ones.
    pub fn seed_well_known(&self) -> Result<Vec<RoleRecord>, AccountError> {
        let created = self.store.write(|tx| {
            let mut created = Vec::new();
            for role in Role::ALL {
                if tx.role_by_name(role.as_str())?.is_none() {
                    created.push(tx.insert_role(role.as_str())?);
                }
            }
            Ok::<_, AccountError>(created)
        })?;
        if !created.is_empty() {
            info!(count = created.len(), "Seeded roles");
        }
        Ok(created)
    }

    pub fn list(&self) -> Result<Vec<RoleRecord>, AccountError> {
        Ok(self.store.read(|tx| tx.roles())?)
    }

    pub fn get(&self, id: u64) -> Result<RoleRecord, AccountError> {
        self.store.read(|tx| tx.role(id))?.ok_or_else(|| not_found(id))
    }

    pub fn get_by_name(&self, name: &str) -> Result<RoleRecord, AccountError> {
        self.store
            .read(|tx| tx.role_by_name(name))?
            .ok_or_else(|| AccountError::NotFound(format!("Role {name} not found")))
    }

    pub fn create(&self, name: &str) -> Result<RoleRecord, AccountError> {
        let name = role_name(name)?;
        let role = self.store.write(|tx| {
            if tx.role_by_name(&name)?.is_some() {
                return Err(AccountError::Conflict(format!("Role {name} already exists")));
            }
            Ok(tx.insert_role(&name)?)
        })?;
        info!(role_id = role.id, name = %role.name, "Role created");
        Ok(role)
    }

    /// Rename a role. The new name must be unused by every other role.
    pub fn rename(&self, id: u64, name: &str) -> Result<RoleRecord, AccountError> {
        let name = role_name(name)?;
        self.store.write(|tx| {
            let mut role = tx.role(id)?.ok_or_else(|| not_found(id))?;
            if role.name == name {
                return Ok(role);
            }
            if Role::is_protected_name(&role.name) {
                return Err(AccountError::InvalidState(format!(
                    "Role {} is protected and cannot be renamed",
                    role.name
                )));
            }
            if tx.role_by_name(&name)?.is_some_and(|other| other.id != id) {
                return Err(AccountError::Conflict(format!("Role {name} already exists")));
            }
            role.name = name;
            role.updated_at = Utc::now();
            tx.put_role(&role)?;
            Ok(role)
        })
    }

    /// Delete a non-protected role, moving its members to the baseline role
    /// first. Both steps commit together.
    pub fn delete(&self, id: u64) -> Result<RoleDeletion, AccountError> {
        let deletion = self.store.write(|tx| {
            let role = tx.role(id)?.ok_or_else(|| not_found(id))?;
            if Role::is_protected_name(&role.name) {
                return Err(AccountError::InvalidState(format!(
                    "Role {} is protected and cannot be deleted",
                    role.name
                )));
            }
            let fallback = tx.role_by_name(Role::BASELINE.as_str())?.ok_or_else(|| {
                AccountError::InvalidState(format!(
                    "Fallback role {} is missing",
                    Role::BASELINE.as_str()
                ))
            })?;

            let reassigned = tx.reassign_role(role.id, fallback.id)?;
            tx.delete_role(role.id)?;
            Ok(RoleDeletion { role, reassigned })
        })?;

        info!(
            role_id = deletion.role.id,
            name = %deletion.role.name,
            reassigned = deletion.reassigned,
            "Role deleted"
        );
        Ok(deletion)
    }
}

fn role_name(raw: &str) -> Result<String, AccountError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AccountError::Validation("Role name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn not_found(id: u64) -> AccountError {
    AccountError::NotFound(format!("Role {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{AccountLifecycle, AccountUpdate, NewAccount};
    use crate::test_support::{seeded_store, temp_store};

    #[test]
    fn seeding_is_idempotent() {
        let (store, _dir) = temp_store();
        let roles = RoleManager::new(&store);

        assert_eq!(roles.seed_well_known().unwrap().len(), 4);
        assert!(roles.seed_well_known().unwrap().is_empty());
        assert_eq!(roles.list().unwrap().len(), 4);
    }

    #[test]
    fn protected_roles_cannot_be_deleted() {
        let (store, _dir) = seeded_store();
        let roles = RoleManager::new(&store);

        for name in ["registered", "subscribed"] {
            let role = roles.get_by_name(name).unwrap();
            assert!(matches!(roles.delete(role.id), Err(AccountError::InvalidState(_))));
        }
    }

    #[test]
    fn delete_reassigns_members_to_baseline() {
        let (store, _dir) = seeded_store();
        let roles = RoleManager::new(&store);
        let lifecycle = AccountLifecycle::new(&store, "auth0");
        let translator = roles.create("translator").unwrap();

        for (id, email) in [("ext|1", "a@x.com"), ("ext|2", "b@x.com")] {
            lifecycle
                .create(NewAccount {
                    id: id.into(),
                    name: "T".into(),
                    email: email.into(),
                    picture: None,
                    email_verified: true,
                    role_id: Some(translator.id),
                })
                .unwrap();
        }

        let deletion = roles.delete(translator.id).unwrap();
        assert_eq!(deletion.reassigned, 2);
        assert!(matches!(roles.get(translator.id), Err(AccountError::NotFound(_))));

        for account in lifecycle.list().unwrap() {
            assert_ne!(account.account.role_id, Some(translator.id));
            assert_eq!(account.role_name(), Some("registered"));
        }
    }

    #[test]
    fn delete_fails_without_fallback_role() {
        let (store, _dir) = temp_store();
        let roles = RoleManager::new(&store);
        let admin = roles.create("admin").unwrap();
        let lifecycle = AccountLifecycle::new(&store, "auth0");
        lifecycle
            .create(NewAccount {
                id: "ext|1".into(),
                name: "A".into(),
                email: "a@x.com".into(),
                picture: None,
                email_verified: true,
                role_id: Some(admin.id),
            })
            .unwrap();

        assert!(matches!(roles.delete(admin.id), Err(AccountError::InvalidState(_))));
        assert_eq!(lifecycle.get("ext|1").unwrap().role_name(), Some("admin"));
    }

    #[test]
    fn create_and_rename_enforce_unique_names() {
        let (store, _dir) = seeded_store();
        let roles = RoleManager::new(&store);

        assert!(matches!(roles.create("admin"), Err(AccountError::Conflict(_))));

        let editor = roles.create("editor").unwrap();
        assert!(matches!(roles.rename(editor.id, "admin"), Err(AccountError::Conflict(_))));

        let renamed = roles.rename(editor.id, "chief-editor").unwrap();
        assert_eq!(renamed.name, "chief-editor");
        assert_eq!(roles.get_by_name("chief-editor").unwrap().id, editor.id);
        assert!(roles.get_by_name("editor").is_err());
    }

    #[test]
    fn protected_roles_cannot_be_renamed() {
        let (store, _dir) = seeded_store();
        let roles = RoleManager::new(&store);
        let registered = roles.get_by_name("registered").unwrap();

        assert!(matches!(
            roles.rename(registered.id, "member"),
            Err(AccountError::InvalidState(_))
        ));
    }

    #[test]
    fn deleted_role_members_keep_working_accounts() {
        let (store, _dir) = seeded_store();
        let roles = RoleManager::new(&store);
        let lifecycle = AccountLifecycle::new(&store, "auth0");
        let guest = roles.create("guest").unwrap();
        lifecycle
            .create(NewAccount {
                id: "ext|1".into(),
                name: "G".into(),
                email: "g@x.com".into(),
                picture: None,
                email_verified: false,
                role_id: None,
            })
            .unwrap();
        lifecycle
            .update("ext|1", AccountUpdate { role_id: Some(guest.id), ..Default::default() })
            .unwrap();

        roles.delete(guest.id).unwrap();
        assert_eq!(lifecycle.get("ext|1").unwrap().role_name(), Some("registered"));
    }
}
