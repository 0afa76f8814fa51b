// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints.
//!
//! `/v1/users/me` serves the caller's own account; the rest are account
//! management for admins holding the user permission.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    accounts::{AccountUpdate, NewAccount, ResolvedAccount},
    auth::CurrentAccount,
    error::ApiError,
    state::AppState,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Role reference embedded in account responses.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct RoleSummary {
    pub id: u64,
    pub name: String,
}

/// Admin permission flags embedded in account responses.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct AdminPermissions {
    pub can_manage_content: bool,
    pub can_manage_users: bool,
    pub can_moderate: bool,
}

/// Account representation with its resolved role.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    /// Subject identifier from the identity provider.
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub email_verified: bool,
    pub blocked: bool,
    /// Assigned role, or null when the account has none.
    pub role: Option<RoleSummary>,
    /// Present only when the account holds an admin grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_permissions: Option<AdminPermissions>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ResolvedAccount> for AccountResponse {
    fn from(resolved: ResolvedAccount) -> Self {
        let ResolvedAccount {
            account,
            role,
            grant,
        } = resolved;
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            picture: account.picture,
            email_verified: account.email_verified,
            blocked: account.blocked,
            role: role.map(|r| RoleSummary {
                id: r.id,
                name: r.name,
            }),
            admin_permissions: grant.map(|g| AdminPermissions {
                can_manage_content: g.can_manage_content,
                can_manage_users: g.can_manage_users,
                can_moderate: g.can_moderate,
            }),
            last_login_at: account.last_login_at,
            created_at: account.created_at,
            updated_at: account.updated_at,
            deleted_at: account.deleted_at,
        }
    }
}

/// Response for account listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountListResponse {
    pub accounts: Vec<AccountResponse>,
    pub total: usize,
}

/// Request to provision an account.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAccountRequest {
    /// Subject identifier; a bare id is prefixed with the default provider.
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    /// Role to assign; defaults to `registered`.
    #[serde(default)]
    pub role_id: Option<u64>,
}

/// Admin update. Identifier and email cannot be changed.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    pub picture: Option<String>,
    pub blocked: Option<bool>,
    pub role_id: Option<u64>,
}

/// Self-service profile update.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub picture: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the caller's account.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn get_me(CurrentAccount(account): CurrentAccount) -> Json<AccountResponse> {
    Json(account.into())
}

/// Update the caller's display name or picture.
#[utoipa::path(
    patch,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 400, description = "Invalid value"),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let updated = state.accounts().update(
        account.id(),
        AccountUpdate {
            name: request.name,
            picture: request.picture,
            ..Default::default()
        },
    )?;
    Ok(Json(updated.into()))
}

/// List active accounts.
#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active accounts", body = AccountListResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized"),
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<AccountListResponse>, ApiError> {
    let accounts: Vec<AccountResponse> = state
        .accounts()
        .list()?
        .into_iter()
        .map(AccountResponse::from)
        .collect();
    let total = accounts.len();
    Ok(Json(AccountListResponse { accounts, total }))
}

/// Provision an account.
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 404, description = "Requested role not found"),
        (status = 409, description = "Identifier or email already in use"),
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let created = state.accounts().create(NewAccount {
        id: request.id,
        name: request.name,
        email: request.email,
        picture: request.picture,
        email_verified: request.email_verified,
        role_id: request.role_id,
    })?;
    info!(actor = %actor.id(), account_id = %created.id(), "Account provisioned");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get an active account.
#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Account subject identifier")),
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 404, description = "Account not found or deactivated"),
    )
)]
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    Ok(Json(state.accounts().get(&id)?.into()))
}

/// Update an active account.
#[utoipa::path(
    patch,
    path = "/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Account subject identifier")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated account", body = AccountResponse),
        (status = 404, description = "Account or role not found"),
    )
)]
pub async fn update_account(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Path(id): Path<String>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let updated = state.accounts().update(
        &id,
        AccountUpdate {
            name: request.name,
            picture: request.picture,
            blocked: request.blocked,
            role_id: request.role_id,
        },
    )?;
    info!(actor = %actor.id(), account_id = %updated.id(), "Account updated");
    Ok(Json(updated.into()))
}

/// Deactivate an account and revoke its admin permissions.
#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Account subject identifier")),
    responses(
        (status = 204, description = "Account deactivated"),
        (status = 404, description = "Account not found or already deactivated"),
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.accounts().soft_delete(&id)?;
    info!(actor = %actor.id(), account_id = %id, "Account deactivation requested");
    Ok(StatusCode::NO_CONTENT)
}

/// Reactivate a deactivated account.
#[utoipa::path(
    post,
    path = "/v1/users/{id}/reactivate",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Account subject identifier")),
    responses(
        (status = 200, description = "Reactivated account", body = AccountResponse),
        (status = 400, description = "Account is already active"),
        (status = 404, description = "Account not found"),
    )
)]
pub async fn reactivate_account(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let reactivated = state.accounts().reactivate(&id)?;
    info!(actor = %actor.id(), account_id = %reactivated.id(), "Account reactivation requested");
    Ok(Json(reactivated.into()))
}
