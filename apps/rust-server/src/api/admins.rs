// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin grant endpoints (superadmin only).
//!
//! A grant only takes effect on permission-gated routes when the account
//! also holds the `admin` or `superadmin` role.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    accounts::GrantChanges, auth::CurrentAccount, error::ApiError, state::AppState,
    storage::AdminGrantRecord,
};

/// Request to grant admin permissions. Omitted flags default to true.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateGrantRequest {
    pub account_id: String,
    pub can_manage_content: Option<bool>,
    pub can_manage_users: Option<bool>,
    pub can_moderate: Option<bool>,
}

/// Partial flag update. Omitted flags are unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateGrantRequest {
    pub can_manage_content: Option<bool>,
    pub can_manage_users: Option<bool>,
    pub can_moderate: Option<bool>,
}

impl From<UpdateGrantRequest> for GrantChanges {
    fn from(request: UpdateGrantRequest) -> Self {
        Self {
            can_manage_content: request.can_manage_content,
            can_manage_users: request.can_manage_users,
            can_moderate: request.can_moderate,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GrantListResponse {
    pub grants: Vec<AdminGrantRecord>,
    pub total: usize,
}

#[utoipa::path(
    get,
    path = "/v1/admins",
    tag = "Admins",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All admin grants", body = GrantListResponse),
        (status = 403, description = "Not authorized"),
    )
)]
pub async fn list_grants(State(state): State<AppState>) -> Result<Json<GrantListResponse>, ApiError> {
    let grants = state.grants().list()?;
    let total = grants.len();
    Ok(Json(GrantListResponse { grants, total }))
}

#[utoipa::path(
    post,
    path = "/v1/admins",
    tag = "Admins",
    security(("bearer_auth" = [])),
    request_body = CreateGrantRequest,
    responses(
        (status = 201, description = "Grant created", body = AdminGrantRecord),
        (status = 404, description = "Account not found or deactivated"),
        (status = 409, description = "Account already has a grant"),
    )
)]
pub async fn create_grant(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Json(request): Json<CreateGrantRequest>,
) -> Result<(StatusCode, Json<AdminGrantRecord>), ApiError> {
    let changes = GrantChanges {
        can_manage_content: request.can_manage_content,
        can_manage_users: request.can_manage_users,
        can_moderate: request.can_moderate,
    };
    let grant = state.grants().create(&request.account_id, changes)?;
    info!(actor = %actor.id(), account_id = %grant.account_id, "Admin grant created via API");
    Ok((StatusCode::CREATED, Json(grant)))
}

#[utoipa::path(
    get,
    path = "/v1/admins/{account_id}",
    tag = "Admins",
    security(("bearer_auth" = [])),
    params(("account_id" = String, Path, description = "Account subject identifier")),
    responses(
        (status = 200, description = "Admin grant", body = AdminGrantRecord),
        (status = 404, description = "No grant for this account"),
    )
)]
pub async fn get_grant(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<AdminGrantRecord>, ApiError> {
    Ok(Json(state.grants().get(&account_id)?))
}

#[utoipa::path(
    patch,
    path = "/v1/admins/{account_id}",
    tag = "Admins",
    security(("bearer_auth" = [])),
    params(("account_id" = String, Path, description = "Account subject identifier")),
    request_body = UpdateGrantRequest,
    responses(
        (status = 200, description = "Updated grant", body = AdminGrantRecord),
        (status = 404, description = "No grant for this account"),
    )
)]
pub async fn update_grant(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Path(account_id): Path<String>,
    Json(request): Json<UpdateGrantRequest>,
) -> Result<Json<AdminGrantRecord>, ApiError> {
    let grant = state.grants().update(&account_id, request.into())?;
    info!(actor = %actor.id(), account_id = %grant.account_id, "Admin grant updated");
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/v1/admins/{account_id}",
    tag = "Admins",
    security(("bearer_auth" = [])),
    params(("account_id" = String, Path, description = "Account subject identifier")),
    responses(
        (status = 204, description = "Grant revoked"),
        (status = 404, description = "No grant for this account"),
    )
)]
pub async fn delete_grant(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Path(account_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.grants().delete(&account_id)?;
    info!(actor = %actor.id(), account_id = %account_id, "Admin grant revoked via API");
    Ok(StatusCode::NO_CONTENT)
}
