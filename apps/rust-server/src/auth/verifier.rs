// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification against the identity provider's key set.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};

use super::claims::{IdentityClaims, VerifiedToken};
use super::error::AuthError;
use super::jwks::JwksManager;
use crate::config::AuthSettings;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Validates bearer tokens: signature, expiry, issuer, audience, subject.
pub struct TokenVerifier {
    jwks: JwksManager,
    issuer: String,
    audience: Option<String>,
}

impl TokenVerifier {
    pub fn new(jwks: JwksManager, issuer: impl Into<String>, audience: Option<String>) -> Self {
        Self {
            jwks,
            issuer: issuer.into(),
            audience,
        }
    }

    /// Build a verifier fetching keys from the configured JWKS endpoint.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let jwks = JwksManager::new(&settings.jwks_url)?
            .with_cache_ttl(settings.jwks_cache_ttl)
            .with_requests_per_minute(settings.jwks_requests_per_minute);
        Ok(Self::new(jwks, &settings.issuer, settings.audience.clone()))
    }

    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }

    /// Verify `token` and return its subject and claims.
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        let (decoding_key, algorithm) = match &header.kid {
            Some(kid) => self.jwks.get_decoding_key(kid).await?,
            None => self.jwks.get_any_decoding_key().await?,
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<IdentityClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => AuthError::MissingSubject,
                _ => AuthError::MalformedToken,
            })?;

        let claims = token_data.claims;
        let subject = claims
            .sub
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingSubject)?
            .to_string();

        Ok(VerifiedToken { subject, claims })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}
