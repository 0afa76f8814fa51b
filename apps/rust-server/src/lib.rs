// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Comic Platform - Account and Authorization Service
//!
//! REST backend that validates identity-provider tokens, gates routes by
//! role and admin permission, and manages the account lifecycle.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and route policy table (Axum)
//! - `auth` - Token verification, identity resolution, role/permission gates
//! - `accounts` - Account lifecycle, roles, admin grants, bootstrap
//! - `storage` - Embedded transactional store (redb)

pub mod accounts;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
