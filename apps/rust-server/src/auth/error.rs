// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Every authentication failure serialises to the same 401 body so callers
//! cannot probe why a token or account was rejected; the precise cause is
//! only logged. Authorization failures return 403 with a generic reason.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication / authorization error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Token audience is invalid
    InvalidAudience,
    /// Token is not yet valid
    TokenNotYetValid,
    /// Token carries no subject identifier
    MissingSubject,
    /// JWKS fetch failed
    JwksFetchError(String),
    /// JWKS refetch refused by the rate limiter
    JwksRateLimited,
    /// No matching key in JWKS
    NoMatchingKey,
    /// No account exists for the token subject
    AccountNotFound,
    /// Account is soft-deleted
    AccountDeactivated,
    /// Account is blocked
    AccountBlocked,
    /// Account role is not among the route's allowed roles
    RoleNotAllowed,
    /// Permission-gated route reached by an account without an elevated role
    InsufficientRole,
    /// Elevated account without an admin grant
    PermissionsNotConfigured,
    /// Admin grant lacks a required flag
    InsufficientPermissions,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error (server-side detail).
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::MissingSubject => "missing_subject",
            AuthError::JwksFetchError(_) => "jwks_fetch_error",
            AuthError::JwksRateLimited => "jwks_rate_limited",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::AccountNotFound => "account_not_found",
            AuthError::AccountDeactivated => "account_deactivated",
            AuthError::AccountBlocked => "account_blocked",
            AuthError::RoleNotAllowed => "role_not_allowed",
            AuthError::InsufficientRole => "insufficient_role",
            AuthError::PermissionsNotConfigured => "permissions_not_configured",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::RoleNotAllowed
            | AuthError::InsufficientRole
            | AuthError::PermissionsNotConfigured
            | AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether this error rejects the caller's identity (HTTP 401).
    pub fn is_unauthenticated(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }

    /// The body returned to the client: generic for 401 and 500.
    fn public_body(&self) -> AuthErrorBody {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => AuthErrorBody {
                error: "Unauthenticated".to_string(),
                error_code: "unauthenticated".to_string(),
            },
            StatusCode::FORBIDDEN => AuthErrorBody {
                error: self.to_string(),
                error_code: self.error_code().to_string(),
            },
            _ => AuthErrorBody {
                error: "Internal server error".to_string(),
                error_code: "internal_error".to_string(),
            },
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::MissingSubject => write!(f, "Token has no subject"),
            AuthError::JwksFetchError(msg) => write!(f, "Failed to fetch JWKS: {msg}"),
            AuthError::JwksRateLimited => write!(f, "JWKS fetch rate limit exceeded"),
            AuthError::NoMatchingKey => write!(f, "No matching key found in JWKS"),
            AuthError::AccountNotFound => write!(f, "Account not found"),
            AuthError::AccountDeactivated => write!(f, "Account deactivated"),
            AuthError::AccountBlocked => write!(f, "Account blocked"),
            AuthError::RoleNotAllowed => write!(f, "Role not allowed for this operation"),
            AuthError::InsufficientRole => write!(f, "Insufficient role"),
            AuthError::PermissionsNotConfigured => write!(f, "Admin permissions not configured"),
            AuthError::InsufficientPermissions => {
                write!(f, "Insufficient permissions for this operation")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.public_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: AuthError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthenticated_errors_share_one_body() {
        for error in [
            AuthError::MissingAuthHeader,
            AuthError::TokenExpired,
            AuthError::InvalidIssuer,
            AuthError::AccountDeactivated,
            AuthError::AccountBlocked,
            AuthError::AccountNotFound,
            AuthError::JwksRateLimited,
        ] {
            let (status, body) = body_of(error).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error_code"], "unauthenticated");
            assert_eq!(body["error"], "Unauthenticated");
        }
    }

    #[tokio::test]
    async fn forbidden_errors_return_403_with_generic_reason() {
        let (status, body) = body_of(AuthError::InsufficientPermissions).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "insufficient_permissions");

        let (status, body) = body_of(AuthError::PermissionsNotConfigured).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "permissions_not_configured");
    }

    #[tokio::test]
    async fn internal_error_hides_message() {
        let (status, body) = body_of(AuthError::InternalError("redb exploded".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn account_state_errors_are_distinct() {
        assert_ne!(AuthError::AccountDeactivated, AuthError::AccountBlocked);
        assert_ne!(
            AuthError::AccountDeactivated.error_code(),
            AuthError::AccountNotFound.error_code()
        );
        assert!(AuthError::AccountDeactivated.is_unauthenticated());
    }
}
