// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! - Keys are cached with a configurable TTL
//! - An unknown `kid` triggers a refetch, bounded by a per-minute rate limit
//! - A stale cache is used when a refetch fails or is rate-limited

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::AuthError;

/// Default JWKS cache TTL (10 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default number of JWKS fetches allowed per minute.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 5;

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Where keys come from.
#[derive(Clone)]
enum KeySource {
    Remote { url: String, client: reqwest::Client },
    /// Fixed key set, never refetched
    Static,
}

/// JWKS manager with caching and fetch rate limiting.
#[derive(Clone)]
pub struct JwksManager {
    source: KeySource,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl JwksManager {
    /// Create a manager fetching keys from `jwks_url`.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::InternalError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            source: KeySource::Remote {
                url: jwks_url.into(),
                client,
            },
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            limiter: Arc::new(per_minute_limiter(DEFAULT_REQUESTS_PER_MINUTE)),
        })
    }

    /// Create a manager serving a fixed key set.
    pub fn with_static_keys(jwks: JwkSet) -> Self {
        Self {
            source: KeySource::Static,
            cache_ttl: Duration::MAX,
            cache: Arc::new(RwLock::new(Some(CacheEntry {
                jwks,
                fetched_at: Instant::now(),
            }))),
            limiter: Arc::new(per_minute_limiter(DEFAULT_REQUESTS_PER_MINUTE)),
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom fetch rate limit (fetches per minute, min 1).
    pub fn with_requests_per_minute(mut self, requests: u32) -> Self {
        self.limiter = Arc::new(per_minute_limiter(requests));
        self
    }

    /// Get the JWKS URL, if keys are fetched remotely.
    pub fn jwks_url(&self) -> Option<&str> {
        match &self.source {
            KeySource::Remote { url, .. } => Some(url),
            KeySource::Static => None,
        }
    }

    /// Get a decoding key for the given key ID.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        let (cached, fresh) = self.cached_key_set().await;

        if let Some(jwks) = &cached {
            if fresh {
                if let Some(jwk) = find_key(jwks, kid) {
                    return jwk_to_decoding_key(jwk);
                }
            }
        }

        match self.refresh_limited().await {
            Ok(jwks) => {
                let jwk = find_key(&jwks, kid).ok_or(AuthError::NoMatchingKey)?;
                jwk_to_decoding_key(jwk)
            }
            Err(e) => {
                // Fall back to whatever we had, stale or not
                if let Some(jwk) = cached.as_ref().and_then(|jwks| find_key(jwks, kid)) {
                    debug!(error = %e, kid, "Using stale JWKS entry");
                    return jwk_to_decoding_key(jwk);
                }
                Err(e)
            }
        }
    }

    /// Get any valid decoding key (for tokens without kid).
    pub async fn get_any_decoding_key(&self) -> Result<(DecodingKey, Algorithm), AuthError> {
        let jwks = match self.cached_key_set().await {
            (Some(jwks), true) => jwks,
            (stale, _) => match self.refresh_limited().await {
                Ok(jwks) => jwks,
                Err(e) => stale.ok_or(e)?,
            },
        };

        jwks.keys
            .iter()
            .find_map(|jwk| jwk_to_decoding_key(jwk).ok())
            .ok_or(AuthError::NoMatchingKey)
    }

    /// Refetch the JWKS now, subject to the fetch rate limit.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.refresh_limited().await.map(|_| ())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        matches!(self.cached_key_set().await, (Some(_), true))
    }

    /// Current key set and whether it is within TTL.
    async fn cached_key_set(&self) -> (Option<JwkSet>, bool) {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => (
                Some(entry.jwks.clone()),
                entry.fetched_at.elapsed() < self.cache_ttl,
            ),
            None => (None, false),
        }
    }

    /// Refetch if the rate limiter allows it.
    async fn refresh_limited(&self) -> Result<JwkSet, AuthError> {
        if matches!(self.source, KeySource::Static) {
            return Err(AuthError::NoMatchingKey);
        }
        if self.limiter.check().is_err() {
            warn!("JWKS refetch refused by rate limiter");
            return Err(AuthError::JwksRateLimited);
        }
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<JwkSet, AuthError> {
        let jwks = self.fetch_jwks().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        Ok(jwks)
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let KeySource::Remote { url, client } = &self.source else {
            return Err(AuthError::NoMatchingKey);
        };

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))
    }
}

fn per_minute_limiter(requests: u32) -> DefaultDirectRateLimiter {
    let requests = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_minute(requests))
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InternalError(format!("Failed to create RSA key: {e}")))?;

            let alg = jwk
                .common
                .key_algorithm
                .map(|a| match a {
                    jsonwebtoken::jwk::KeyAlgorithm::RS384 => Algorithm::RS384,
                    jsonwebtoken::jwk::KeyAlgorithm::RS512 => Algorithm::RS512,
                    _ => Algorithm::RS256,
                })
                .unwrap_or(Algorithm::RS256);

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::InternalError(format!("Failed to create EC key: {e}")))?;

            let alg = jwk
                .common
                .key_algorithm
                .map(|a| match a {
                    jsonwebtoken::jwk::KeyAlgorithm::ES384 => Algorithm::ES384,
                    _ => Algorithm::ES256,
                })
                .unwrap_or(Algorithm::ES256);

            Ok((key, alg))
        }
        _ => Err(AuthError::InternalError(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
