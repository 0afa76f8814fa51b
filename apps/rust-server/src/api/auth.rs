// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login synchronisation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use super::users::AccountResponse;
use crate::{
    accounts::LoginOutcome,
    auth::{AuthError, VerifiedIdentity},
    error::ApiError,
    state::AppState,
};

/// Provision the caller's account on first login, or record the login.
///
/// Only a valid token is required: the account may not exist yet.
#[utoipa::path(
    post,
    path = "/v1/auth/sync",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Existing account", body = AccountResponse),
        (status = 201, description = "Account provisioned", body = AccountResponse),
        (status = 400, description = "Token lacks an email claim"),
        (status = 401, description = "Not authenticated, deactivated or blocked"),
        (status = 409, description = "Email already registered to another account"),
    )
)]
pub async fn sync_login(
    State(state): State<AppState>,
    VerifiedIdentity(token): VerifiedIdentity,
) -> Result<(StatusCode, Json<AccountResponse>), Response> {
    let outcome = state
        .accounts()
        .sync_login(&token)
        .map_err(|e| ApiError::from(e).into_response())?;

    let rejection = match outcome {
        LoginOutcome::Created(account) => {
            info!(account_id = %account.id(), "First login, account provisioned");
            return Ok((StatusCode::CREATED, Json(account.into())));
        }
        LoginOutcome::Returning(account) => return Ok((StatusCode::OK, Json(account.into()))),
        LoginOutcome::Deactivated => AuthError::AccountDeactivated,
        LoginOutcome::Blocked => AuthError::AccountBlocked,
    };

    warn!(subject = %token.subject, error_code = rejection.error_code(), "Login rejected");
    Err(rejection.into_response())
}
