// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit and router tests.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::accounts::{Readiness, RoleManager};
use crate::auth::claims::{IdentityClaims, VerifiedToken};
use crate::auth::jwks::JwksManager;
use crate::auth::roles::Role;
use crate::auth::verifier::TokenVerifier;
use crate::state::AppState;
use crate::storage::{AccountRecord, AdminGrantRecord, Snapshot, Store, StoreError};

pub const TEST_ISSUER: &str = "https://comics.test.auth0.com/";
pub const TEST_AUDIENCE: &str = "https://api.comics.test";
pub const TEST_PREFIX: &str = "auth0";

/// ES256 signer with a freshly generated P-256 key.
pub struct TokenSigner {
    kid: String,
    encoding_key: EncodingKey,
    x: String,
    y: String,
}

impl TokenSigner {
    pub fn new() -> Self {
        Self::with_kid(&format!("test-key-{}", uuid::Uuid::new_v4()))
    }

    pub fn with_kid(kid: &str) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng).unwrap();
        let pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng).unwrap();
        // Uncompressed point: 0x04 || x || y
        let public = pair.public_key().as_ref();

        Self {
            kid: kid.to_string(),
            encoding_key: EncodingKey::from_ec_der(pkcs8.as_ref()),
            x: URL_SAFE_NO_PAD.encode(&public[1..33]),
            y: URL_SAFE_NO_PAD.encode(&public[33..65]),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn jwks(&self) -> JwkSet {
        serde_json::from_value(json!({
            "keys": [{
                "kty": "EC",
                "crv": "P-256",
                "x": self.x,
                "y": self.y,
                "kid": self.kid,
                "alg": "ES256",
                "use": "sig"
            }]
        }))
        .unwrap()
    }

    /// Valid claims for `subject`, expiring in an hour.
    pub fn claims_for(&self, subject: &str) -> Value {
        let now = Utc::now().timestamp();
        json!({
            "sub": subject,
            "iss": TEST_ISSUER,
            "aud": TEST_AUDIENCE,
            "iat": now,
            "exp": now + 3600,
            "email": format!("{}@example.com", subject.replace('|', "-")),
            "email_verified": true,
        })
    }

    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).unwrap()
    }

    pub fn token_for(&self, subject: &str) -> String {
        self.sign(&self.claims_for(subject))
    }
}

/// A verified token without going through signing.
pub fn claims_token(subject: &str, email: Option<&str>) -> VerifiedToken {
    VerifiedToken {
        subject: subject.to_string(),
        claims: IdentityClaims {
            sub: Some(subject.to_string()),
            exp: Utc::now().timestamp() + 3600,
            iat: None,
            iss: TEST_ISSUER.to_string(),
            aud: None,
            email: email.map(str::to_string),
            email_verified: Some(true),
            name: None,
            picture: None,
        },
    }
}

/// Empty store in a temporary directory.
pub fn temp_store() -> (Arc<Store>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("test.redb")).unwrap();
    (Arc::new(store), dir)
}

/// Store with the well-known roles seeded.
pub fn seeded_store() -> (Arc<Store>, TempDir) {
    let (store, dir) = temp_store();
    RoleManager::new(&store).seed_well_known().unwrap();
    (store, dir)
}

/// Ready application state backed by a seeded store and a static key set.
pub struct TestContext {
    pub state: AppState,
    pub signer: TokenSigner,
    _dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let (store, dir) = seeded_store();
        let signer = TokenSigner::new();
        let verifier = TokenVerifier::new(
            JwksManager::with_static_keys(signer.jwks()),
            TEST_ISSUER,
            Some(TEST_AUDIENCE.to_string()),
        );
        let readiness = Readiness::new();
        readiness.mark_ready();

        Self {
            state: AppState::new(store, verifier, readiness, TEST_PREFIX),
            signer,
            _dir: dir,
        }
    }

    pub fn store(&self) -> &Store {
        &self.state.store
    }

    /// `Authorization` header value for `subject`.
    pub fn bearer(&self, subject: &str) -> String {
        format!("Bearer {}", self.signer.token_for(subject))
    }

    /// Insert an active account holding `role`.
    pub fn seed_account(&self, id: &str, email: &str, role: Role) -> AccountRecord {
        self.store()
            .write(|tx| {
                let role = tx
                    .role_by_name(role.as_str())?
                    .ok_or_else(|| StoreError::UniqueViolation("missing role".into()))?;
                let now = Utc::now();
                let account = AccountRecord {
                    id: id.to_string(),
                    name: id.to_string(),
                    email: email.to_string(),
                    picture: None,
                    email_verified: true,
                    blocked: false,
                    role_id: Some(role.id),
                    last_login_at: None,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                };
                tx.put_account(&account)?;
                Ok::<_, StoreError>(account)
            })
            .unwrap()
    }

    pub fn grant(&self, id: &str, content: bool, users: bool, moderation: bool) {
        self.store()
            .write(|tx| tx.put_admin_grant(&AdminGrantRecord::new(id, content, users, moderation)))
            .unwrap();
    }
}
