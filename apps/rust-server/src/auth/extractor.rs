// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the caller identity.
//!
//! The [`authorize`](super::middleware::authorize) middleware stores the
//! verified token or resolved account in request extensions; these
//! extractors hand them to handlers without touching the store again.
//!
//! ```rust,ignore
//! async fn get_me(CurrentAccount(account): CurrentAccount) -> Json<AccountResponse> {
//!     Json(AccountResponse::from(account))
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::claims::VerifiedToken;
use super::error::AuthError;
use crate::accounts::ResolvedAccount;

/// The active account behind the request. Requires an account policy.
pub struct CurrentAccount(pub ResolvedAccount);

impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ResolvedAccount>()
            .cloned()
            .map(CurrentAccount)
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// The verified token behind the request. Requires a token policy.
pub struct VerifiedIdentity(pub VerifiedToken);

impl<S> FromRequestParts<S> for VerifiedIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedToken>()
            .cloned()
            .map(VerifiedIdentity)
            .ok_or(AuthError::MissingAuthHeader)
    }
}
