// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims issued by the external identity provider.

use serde::Deserialize;

/// Claims decoded from a verified bearer token.
///
/// Only `sub` is required by the service; profile claims are used when an
/// account is provisioned on first login.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Subject - the provider's stable user identifier (e.g. `auth0|123`)
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Issuer
    #[serde(default)]
    pub iss: String,

    /// Audience (validated by jsonwebtoken, not read directly)
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: Option<bool>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub picture: Option<String>,
}

/// A token that passed signature and claim validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Subject identifier, guaranteed non-empty
    pub subject: String,
    pub claims: IdentityClaims,
}

impl VerifiedToken {
    /// Display name to use when provisioning: `name`, else the email local part.
    pub fn display_name(&self) -> Option<String> {
        self.claims
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                self.claims
                    .email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(name: Option<&str>, email: Option<&str>) -> VerifiedToken {
        VerifiedToken {
            subject: "auth0|123".to_string(),
            claims: IdentityClaims {
                sub: Some("auth0|123".to_string()),
                exp: 1700003600,
                iat: Some(1700000000),
                iss: "https://idp.example.com/".to_string(),
                aud: None,
                email: email.map(str::to_string),
                email_verified: Some(true),
                name: name.map(str::to_string),
                picture: None,
            },
        }
    }

    #[test]
    fn display_name_prefers_name_claim() {
        assert_eq!(
            token(Some("Mika"), Some("mika@example.com")).display_name().as_deref(),
            Some("Mika")
        );
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        assert_eq!(
            token(Some("  "), Some("reader@example.com")).display_name().as_deref(),
            Some("reader")
        );
        assert_eq!(token(None, None).display_name(), None);
    }

    #[test]
    fn claims_deserialize_with_missing_optional_fields() {
        let claims: IdentityClaims =
            serde_json::from_str(r#"{"sub":"auth0|1","exp":10,"iss":"x"}"#).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("auth0|1"));
        assert!(claims.email.is_none());
    }
}
