// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded account database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: subject → serialized AccountRecord
//! - `account_emails`: lowercase email → subject (unique index)
//! - `roles`: role_id → serialized RoleRecord
//! - `role_names`: role name → role_id (unique index)
//! - `admin_grants`: subject → serialized AdminGrantRecord (one per account)
//! - `sequences`: sequence name → next id
//!
//! All access goes through [`Store::read`] and [`Store::write`]. A write
//! closure either commits as a whole or is aborted before its error is
//! returned, so multi-step mutations never leave partial state behind.

use std::path::Path;

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::records::{AccountRecord, AdminGrantRecord, RoleRecord};

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

const ACCOUNT_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("account_emails");

const ROLES: TableDefinition<u64, &[u8]> = TableDefinition::new("roles");

const ROLE_NAMES: TableDefinition<&str, u64> = TableDefinition::new("role_names");

const ADMIN_GRANTS: TableDefinition<&str, &[u8]> = TableDefinition::new("admin_grants");

const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const ROLE_SEQUENCE: &str = "role_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("cannot create data directory {path}: {source}")]
    DataDir {
        path: String,
        source: std::io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Store
// =============================================================================

/// Embedded ACID account database.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::DataDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ACCOUNT_EMAILS)?;
            let _ = write_txn.open_table(ROLES)?;
            let _ = write_txn.open_table(ROLE_NAMES)?;
            let _ = write_txn.open_table(ADMIN_GRANTS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap liveness probe: opens and closes a read transaction.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ROLES)?;
        Ok(())
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<T, E>(&self, f: impl FnOnce(&ReadTx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_read().map_err(StoreError::from)?;
        f(&ReadTx { txn })
    }

    /// Run `f` inside a single write transaction.
    ///
    /// Commits when `f` returns `Ok`. When `f` fails the transaction is
    /// aborted first and the error is returned afterwards.
    pub fn write<T, E>(&self, f: impl FnOnce(&WriteTx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        let tx = WriteTx { txn };
        match f(&tx) {
            Ok(value) => {
                tx.txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = tx.txn.abort() {
                    warn!(error = %abort_err, "Failed to abort write transaction");
                }
                Err(e)
            }
        }
    }
}

// =============================================================================
// Snapshot reads (shared by read and write transactions)
// =============================================================================

/// Read operations available inside both read and write transactions.
pub trait Snapshot {
    fn account(&self, id: &str) -> StoreResult<Option<AccountRecord>>;
    fn account_id_by_email(&self, email: &str) -> StoreResult<Option<String>>;
    fn accounts(&self) -> StoreResult<Vec<AccountRecord>>;
    fn role(&self, id: u64) -> StoreResult<Option<RoleRecord>>;
    fn role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>>;
    fn roles(&self) -> StoreResult<Vec<RoleRecord>>;
    fn admin_grant(&self, account_id: &str) -> StoreResult<Option<AdminGrantRecord>>;
    fn admin_grants(&self) -> StoreResult<Vec<AdminGrantRecord>>;
}

fn get_json<T, Tb>(table: &Tb, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    Tb: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn all_json<T, K, Tb>(table: &Tb) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    K: redb::Key + 'static,
    Tb: ReadableTable<K, &'static [u8]>,
{
    let mut items = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        items.push(serde_json::from_slice(value.value())?);
    }
    Ok(items)
}

fn get_role<Tb>(table: &Tb, id: u64) -> StoreResult<Option<RoleRecord>>
where
    Tb: ReadableTable<u64, &'static [u8]>,
{
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn get_str<Tb>(table: &Tb, key: &str) -> StoreResult<Option<String>>
where
    Tb: ReadableTable<&'static str, &'static str>,
{
    Ok(table.get(key)?.map(|v| v.value().to_string()))
}

fn get_u64<Tb>(table: &Tb, key: &str) -> StoreResult<Option<u64>>
where
    Tb: ReadableTable<&'static str, u64>,
{
    Ok(table.get(key)?.map(|v| v.value()))
}

/// Implements [`Snapshot`] for a transaction type whose `open_table` returns
/// a readable table.
macro_rules! impl_snapshot {
    ($ty:ty) => {
        impl Snapshot for $ty {
            fn account(&self, id: &str) -> StoreResult<Option<AccountRecord>> {
                let table = self.txn.open_table(ACCOUNTS)?;
                get_json(&table, id)
            }

            fn account_id_by_email(&self, email: &str) -> StoreResult<Option<String>> {
                let table = self.txn.open_table(ACCOUNT_EMAILS)?;
                get_str(&table, &email.to_lowercase())
            }

            fn accounts(&self) -> StoreResult<Vec<AccountRecord>> {
                let table = self.txn.open_table(ACCOUNTS)?;
                all_json(&table)
            }

            fn role(&self, id: u64) -> StoreResult<Option<RoleRecord>> {
                let table = self.txn.open_table(ROLES)?;
                get_role(&table, id)
            }

            fn role_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
                let names = self.txn.open_table(ROLE_NAMES)?;
                match get_u64(&names, name)? {
                    Some(id) => {
                        let roles = self.txn.open_table(ROLES)?;
                        get_role(&roles, id)
                    }
                    None => Ok(None),
                }
            }

            fn roles(&self) -> StoreResult<Vec<RoleRecord>> {
                let table = self.txn.open_table(ROLES)?;
                all_json(&table)
            }

            fn admin_grant(&self, account_id: &str) -> StoreResult<Option<AdminGrantRecord>> {
                let table = self.txn.open_table(ADMIN_GRANTS)?;
                get_json(&table, account_id)
            }

            fn admin_grants(&self) -> StoreResult<Vec<AdminGrantRecord>> {
                let table = self.txn.open_table(ADMIN_GRANTS)?;
                all_json(&table)
            }
        }
    };
}

/// Read-only transaction handle.
pub struct ReadTx {
    txn: ReadTransaction,
}

/// Read-write transaction handle. Obtained through [`Store::write`].
pub struct WriteTx {
    txn: WriteTransaction,
}

impl_snapshot!(ReadTx);
impl_snapshot!(WriteTx);

// =============================================================================
// Mutations
// =============================================================================

impl WriteTx {
    /// Insert or replace an account, maintaining the email index.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when the email already
    /// belongs to a different account.
    pub fn put_account(&self, account: &AccountRecord) -> StoreResult<()> {
        let email_key = account.email.to_lowercase();
        let mut emails = self.txn.open_table(ACCOUNT_EMAILS)?;
        if let Some(owner) = get_str(&emails, &email_key)? {
            if owner != account.id {
                return Err(StoreError::UniqueViolation(format!("email {email_key}")));
            }
        }

        let mut accounts = self.txn.open_table(ACCOUNTS)?;
        let previous: Option<AccountRecord> = get_json(&accounts, &account.id)?;
        if let Some(previous) = previous {
            let previous_key = previous.email.to_lowercase();
            if previous_key != email_key {
                emails.remove(previous_key.as_str())?;
            }
        }

        let json = serde_json::to_vec(account)?;
        accounts.insert(account.id.as_str(), json.as_slice())?;
        emails.insert(email_key.as_str(), account.id.as_str())?;
        Ok(())
    }

    /// Set the deletion timestamp only if it is currently unset.
    ///
    /// Returns `false` when the account does not exist or is already deleted.
    pub fn mark_account_deleted(
        &self,
        id: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<bool> {
        let mut accounts = self.txn.open_table(ACCOUNTS)?;
        let existing: Option<AccountRecord> = get_json(&accounts, id)?;
        let Some(mut account) = existing else {
            return Ok(false);
        };
        if account.is_deleted() {
            return Ok(false);
        }

        account.deleted_at = Some(at);
        account.updated_at = at;
        let json = serde_json::to_vec(&account)?;
        accounts.insert(id, json.as_slice())?;
        Ok(true)
    }

    /// Create a role with a freshly allocated id.
    pub fn insert_role(&self, name: &str) -> StoreResult<RoleRecord> {
        let mut names = self.txn.open_table(ROLE_NAMES)?;
        if get_u64(&names, name)?.is_some() {
            return Err(StoreError::UniqueViolation(format!("role name {name}")));
        }

        let id = self.next_id(ROLE_SEQUENCE)?;
        let now = chrono::Utc::now();
        let role = RoleRecord {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut roles = self.txn.open_table(ROLES)?;
        let json = serde_json::to_vec(&role)?;
        roles.insert(id, json.as_slice())?;
        names.insert(name, id)?;
        Ok(role)
    }

    /// Replace an existing role, keeping the name index in sync.
    pub fn put_role(&self, role: &RoleRecord) -> StoreResult<()> {
        let mut names = self.txn.open_table(ROLE_NAMES)?;
        if let Some(owner) = get_u64(&names, &role.name)? {
            if owner != role.id {
                return Err(StoreError::UniqueViolation(format!("role name {}", role.name)));
            }
        }

        let mut roles = self.txn.open_table(ROLES)?;
        if let Some(previous) = get_role(&roles, role.id)? {
            if previous.name != role.name {
                names.remove(previous.name.as_str())?;
            }
        }

        let json = serde_json::to_vec(role)?;
        roles.insert(role.id, json.as_slice())?;
        names.insert(role.name.as_str(), role.id)?;
        Ok(())
    }

    /// Remove a role and its name index entry. Returns `false` if absent.
    pub fn delete_role(&self, id: u64) -> StoreResult<bool> {
        let mut roles = self.txn.open_table(ROLES)?;
        let Some(role) = get_role(&roles, id)? else {
            return Ok(false);
        };
        roles.remove(id)?;
        let mut names = self.txn.open_table(ROLE_NAMES)?;
        names.remove(role.name.as_str())?;
        Ok(true)
    }

    /// Point every account holding role `from` at role `to`.
    ///
    /// Returns the number of accounts reassigned.
    pub fn reassign_role(&self, from: u64, to: u64) -> StoreResult<usize> {
        let mut accounts = self.txn.open_table(ACCOUNTS)?;
        let members: Vec<AccountRecord> = all_json::<AccountRecord, _, _>(&accounts)?
            .into_iter()
            .filter(|a| a.role_id == Some(from))
            .collect();

        let now = chrono::Utc::now();
        for mut account in members.iter().cloned() {
            account.role_id = Some(to);
            account.updated_at = now;
            let json = serde_json::to_vec(&account)?;
            accounts.insert(account.id.as_str(), json.as_slice())?;
        }
        Ok(members.len())
    }

    /// Insert or replace the admin grant for `grant.account_id`.
    pub fn put_admin_grant(&self, grant: &AdminGrantRecord) -> StoreResult<()> {
        let mut grants = self.txn.open_table(ADMIN_GRANTS)?;
        let json = serde_json::to_vec(grant)?;
        grants.insert(grant.account_id.as_str(), json.as_slice())?;
        Ok(())
    }

    /// Remove the admin grant tied to `account_id`. Returns `false` if none existed.
    pub fn delete_admin_grant(&self, account_id: &str) -> StoreResult<bool> {
        let mut grants = self.txn.open_table(ADMIN_GRANTS)?;
        let removed = grants.remove(account_id)?.is_some();
        Ok(removed)
    }

    fn next_id(&self, sequence: &str) -> StoreResult<u64> {
        let mut table = self.txn.open_table(SEQUENCES)?;
        let next = get_u64(&table, sequence)?.unwrap_or(1);
        table.insert(sequence, next + 1)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn open_store() -> (Store, TempDir) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::open(&dir.path().join("test.redb")).expect("Failed to open store");
        (store, dir)
    }

    #[test]
    fn open_creates_missing_data_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/data/test.redb");
        Store::open(&path).unwrap().ping().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unusable_data_dir_reports_io_cause() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Store::open(&blocker.join("test.redb"));
        assert!(matches!(result, Err(StoreError::DataDir { .. })));
    }

    fn account(id: &str, email: &str) -> AccountRecord {
        let now = Utc::now();
        AccountRecord {
            id: id.to_string(),
            name: "Reader".to_string(),
            email: email.to_string(),
            picture: None,
            email_verified: false,
            blocked: false,
            role_id: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn put_and_read_account_by_email() {
        let (store, _dir) = open_store();
        store
            .write(|tx| tx.put_account(&account("auth0|1", "Reader@Example.com")))
            .unwrap();

        let found: StoreResult<_> = store.read(|tx| tx.account_id_by_email("reader@example.com"));
        assert_eq!(found.unwrap().as_deref(), Some("auth0|1"));
    }

    #[test]
    fn email_index_rejects_second_owner() {
        let (store, _dir) = open_store();
        store
            .write(|tx| tx.put_account(&account("auth0|1", "a@x.com")))
            .unwrap();

        let result = store.write(|tx| tx.put_account(&account("auth0|2", "A@x.com")));
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
    }

    #[test]
    fn failed_write_closure_leaves_no_trace() {
        let (store, _dir) = open_store();
        let result: StoreResult<()> = store.write(|tx| {
            tx.put_account(&account("auth0|1", "a@x.com"))?;
            Err(StoreError::UniqueViolation("simulated".to_string()))
        });
        assert!(result.is_err());

        let found: StoreResult<_> = store.read(|tx| tx.account("auth0|1"));
        assert!(found.unwrap().is_none());
        let by_email: StoreResult<_> = store.read(|tx| tx.account_id_by_email("a@x.com"));
        assert!(by_email.unwrap().is_none());
    }

    #[test]
    fn mark_deleted_only_once() {
        let (store, _dir) = open_store();
        store
            .write(|tx| tx.put_account(&account("auth0|1", "a@x.com")))
            .unwrap();

        let first: StoreResult<bool> = store.write(|tx| tx.mark_account_deleted("auth0|1", Utc::now()));
        let second: StoreResult<bool> =
            store.write(|tx| tx.mark_account_deleted("auth0|1", Utc::now()));
        let missing: StoreResult<bool> =
            store.write(|tx| tx.mark_account_deleted("auth0|nobody", Utc::now()));

        assert!(first.unwrap());
        assert!(!second.unwrap());
        assert!(!missing.unwrap());
    }

    #[test]
    fn role_ids_are_sequential_and_names_unique() {
        let (store, _dir) = open_store();
        let a = store.write(|tx| tx.insert_role("registered")).unwrap();
        let b = store.write(|tx| tx.insert_role("admin")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        let dup = store.write(|tx| tx.insert_role("admin"));
        assert!(matches!(dup, Err(StoreError::UniqueViolation(_))));
    }

    #[test]
    fn renaming_role_moves_name_index() {
        let (store, _dir) = open_store();
        let mut role = store.write(|tx| tx.insert_role("editor")).unwrap();
        role.name = "curator".to_string();
        store.write(|tx| tx.put_role(&role)).unwrap();

        let old: StoreResult<_> = store.read(|tx| tx.role_by_name("editor"));
        let new: StoreResult<_> = store.read(|tx| tx.role_by_name("curator"));
        assert!(old.unwrap().is_none());
        assert_eq!(new.unwrap().map(|r| r.id), Some(role.id));
    }

    #[test]
    fn reassign_role_moves_all_members() {
        let (store, _dir) = open_store();
        let moved = store
            .write(|tx| {
                let from = tx.insert_role("editor")?;
                let to = tx.insert_role("registered")?;
                let mut a = account("auth0|1", "a@x.com");
                a.role_id = Some(from.id);
                let mut b = account("auth0|2", "b@x.com");
                b.role_id = Some(from.id);
                tx.put_account(&a)?;
                tx.put_account(&b)?;
                tx.put_account(&account("auth0|3", "c@x.com"))?;
                tx.reassign_role(from.id, to.id)
            })
            .unwrap();
        assert_eq!(moved, 2);

        let accounts: Vec<AccountRecord> = store.read(|tx| tx.accounts()).unwrap();
        assert!(accounts.iter().all(|a| a.role_id != Some(1)));
    }

    #[test]
    fn admin_grant_put_and_delete() {
        let (store, _dir) = open_store();
        store
            .write(|tx| tx.put_admin_grant(&AdminGrantRecord::new("auth0|1", true, false, true)))
            .unwrap();

        let grant: Option<AdminGrantRecord> = store.read(|tx| tx.admin_grant("auth0|1")).unwrap();
        assert!(grant.unwrap().can_moderate);

        let removed: StoreResult<bool> = store.write(|tx| tx.delete_admin_grant("auth0|1"));
        assert!(removed.unwrap());
        let removed_again: StoreResult<bool> = store.write(|tx| tx.delete_admin_grant("auth0|1"));
        assert!(!removed_again.unwrap());
    }
}
