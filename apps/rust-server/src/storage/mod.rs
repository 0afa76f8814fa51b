// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Storage
//!
//! Persistent storage for accounts, roles and admin grants in an embedded
//! redb database. The database file lives under `DATA_DIR` (see `config`).
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   comic.redb
//!     accounts        subject -> account
//!     account_emails  email   -> subject
//!     roles           id      -> role
//!     role_names      name    -> id
//!     admin_grants    subject -> grant
//!     sequences       name    -> next id
//! ```

pub mod database;
pub mod records;

pub use database::{ReadTx, Snapshot, Store, StoreError, StoreResult, WriteTx};
pub use records::{AccountRecord, AdminGrantRecord, RoleRecord};

/// File name of the account database inside the data directory.
pub const DATABASE_FILE: &str = "comic.redb";
