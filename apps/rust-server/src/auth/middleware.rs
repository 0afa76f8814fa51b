// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization middleware.
//!
//! Looks up the matched route in the policy table and, for protected routes,
//! runs verify → resolve → role gate → permission gate in order. The first
//! failure ends the request. On success the verified token or resolved
//! account is stored in request extensions for the extractors.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/v1/users", get(list_accounts))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), authorize))
//!     .with_state(state);
//! ```

use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use super::claims::VerifiedToken;
use super::error::AuthError;
use super::gates::{permission_gate, role_gate};
use super::policy::{Access, RoutePolicy};
use super::verifier::bearer_token;
use crate::accounts::ResolvedAccount;
use crate::state::AppState;

/// Who passed the gates.
#[derive(Debug, Clone)]
pub enum Principal {
    Token(VerifiedToken),
    Account(Box<ResolvedAccount>),
}

/// Enforce the route policy table.
pub async fn authorize(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let policy = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| state.policies.lookup(request.method(), path.as_str()))
        .copied();

    let Some(policy) = policy else {
        return next.run(request).await;
    };

    match enforce(&state, &policy, request.headers()).await {
        Ok(Principal::Token(token)) => {
            request.extensions_mut().insert(token);
        }
        Ok(Principal::Account(account)) => {
            request.extensions_mut().insert(*account);
        }
        Err(e) => {
            let path = request.uri().path();
            if e.status_code().is_server_error() {
                error!(error = %e, method = %request.method(), path, "Authorization failed");
            } else {
                warn!(
                    error_code = e.error_code(),
                    reason = %e,
                    method = %request.method(),
                    path,
                    "Request rejected"
                );
            }
            return e.into_response();
        }
    }

    next.run(request).await
}

/// Run the gate sequence for one request.
pub async fn enforce(
    state: &AppState,
    policy: &RoutePolicy,
    headers: &HeaderMap,
) -> Result<Principal, AuthError> {
    let token = bearer_token(headers)?;
    let verified = state.verifier.verify(token).await?;

    if policy.access == Access::Token {
        return Ok(Principal::Token(verified));
    }

    let account = state.resolver().resolve(&verified.subject)?;
    role_gate(&account, policy.roles)?;
    permission_gate(&account, policy.permissions)?;
    Ok(Principal::Account(Box::new(account)))
}
