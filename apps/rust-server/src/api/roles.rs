// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{auth::CurrentAccount, error::ApiError, state::AppState, storage::RoleRecord};

/// Request to create or rename a role.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RoleNameRequest {
    pub name: String,
}

/// Response for role listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleListResponse {
    pub roles: Vec<RoleRecord>,
    pub total: usize,
}

/// Response for role deletion.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRoleResponse {
    /// Deleted role.
    pub role: RoleRecord,
    /// Number of accounts moved to the `registered` role.
    pub reassigned_accounts: usize,
}

#[utoipa::path(
    get,
    path = "/v1/roles",
    tag = "Roles",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All roles", body = RoleListResponse),
        (status = 403, description = "Not authorized"),
    )
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<RoleListResponse>, ApiError> {
    let roles = state.roles().list()?;
    let total = roles.len();
    Ok(Json(RoleListResponse { roles, total }))
}

#[utoipa::path(
    get,
    path = "/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Role identifier")),
    responses(
        (status = 200, description = "Role", body = RoleRecord),
        (status = 404, description = "Role not found"),
    )
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RoleRecord>, ApiError> {
    Ok(Json(state.roles().get(id)?))
}

#[utoipa::path(
    post,
    path = "/v1/roles",
    tag = "Roles",
    security(("bearer_auth" = [])),
    request_body = RoleNameRequest,
    responses(
        (status = 201, description = "Role created", body = RoleRecord),
        (status = 409, description = "Role name already in use"),
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Json(request): Json<RoleNameRequest>,
) -> Result<(StatusCode, Json<RoleRecord>), ApiError> {
    let role = state.roles().create(&request.name)?;
    info!(actor = %actor.id(), role_id = role.id, "Role created via API");
    Ok((StatusCode::CREATED, Json(role)))
}

/// Rename a role. Protected roles keep their names.
#[utoipa::path(
    patch,
    path = "/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Role identifier")),
    request_body = RoleNameRequest,
    responses(
        (status = 200, description = "Role renamed", body = RoleRecord),
        (status = 400, description = "Role is protected"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role name already in use"),
    )
)]
pub async fn rename_role(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Path(id): Path<u64>,
    Json(request): Json<RoleNameRequest>,
) -> Result<Json<RoleRecord>, ApiError> {
    let role = state.roles().rename(id, &request.name)?;
    info!(actor = %actor.id(), role_id = role.id, name = %role.name, "Role renamed");
    Ok(Json(role))
}

/// Delete a role, moving its members to `registered`.
#[utoipa::path(
    delete,
    path = "/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Role identifier")),
    responses(
        (status = 200, description = "Role deleted", body = DeleteRoleResponse),
        (status = 400, description = "Role is protected or fallback role is missing"),
        (status = 404, description = "Role not found"),
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    CurrentAccount(actor): CurrentAccount,
    Path(id): Path<u64>,
) -> Result<Json<DeleteRoleResponse>, ApiError> {
    let deletion = state.roles().delete(id)?;
    info!(actor = %actor.id(), role_id = id, "Role deletion requested");
    Ok(Json(DeleteRoleResponse {
        role: deletion.role,
        reassigned_accounts: deletion.reassigned,
    }))
}
