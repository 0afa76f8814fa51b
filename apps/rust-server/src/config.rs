// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into [`Settings`] and injected from there.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the account database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Required |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `AUTH_JWKS_URL` | JWKS endpoint for JWT verification | `<issuer>/.well-known/jwks.json` |
//! | `AUTH_JWKS_CACHE_TTL_SECS` | JWKS cache lifetime | `600` |
//! | `AUTH_JWKS_REQUESTS_PER_MINUTE` | Max JWKS fetches per minute | `5` |
//! | `AUTH_SUBJECT_PREFIX` | Provider prefix for bare subject ids | `auth0` |
//! | `BOOTSTRAP_SUBJECT` | Subject of the bootstrap superadmin | Optional |
//! | `BOOTSTRAP_EMAIL` | Email of the bootstrap superadmin | Optional |
//! | `BOOTSTRAP_NAME` | Display name of the bootstrap superadmin | `Super Admin` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const AUTH_JWKS_CACHE_TTL_ENV: &str = "AUTH_JWKS_CACHE_TTL_SECS";
pub const AUTH_JWKS_RPM_ENV: &str = "AUTH_JWKS_REQUESTS_PER_MINUTE";
pub const AUTH_SUBJECT_PREFIX_ENV: &str = "AUTH_SUBJECT_PREFIX";

pub const BOOTSTRAP_SUBJECT_ENV: &str = "BOOTSTRAP_SUBJECT";
pub const BOOTSTRAP_EMAIL_ENV: &str = "BOOTSTRAP_EMAIL";
pub const BOOTSTRAP_NAME_ENV: &str = "BOOTSTRAP_NAME";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_JWKS_REQUESTS_PER_MINUTE: u32 = 5;
const DEFAULT_SUBJECT_PREFIX: &str = "auth0";
const DEFAULT_BOOTSTRAP_NAME: &str = "Super Admin";

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the service reads from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub auth: AuthSettings,
    /// `None` disables the privileged-account bootstrap.
    pub bootstrap: Option<BootstrapSettings>,
}

/// Token verification settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub issuer: String,
    pub audience: Option<String>,
    pub jwks_url: String,
    pub jwks_cache_ttl: Duration,
    pub jwks_requests_per_minute: u32,
    /// Prefix used to canonicalise bare subject identifiers (`<prefix>|<id>`)
    pub subject_prefix: String,
}

/// Identity of the privileged account ensured at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSettings {
    pub subject: String,
    pub email: String,
    pub name: String,
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Path of the embedded database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(crate::storage::DATABASE_FILE)
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let issuer = get(AUTH_ISSUER_ENV).ok_or(ConfigError::Missing(AUTH_ISSUER_ENV))?;
        let jwks_url = match get(AUTH_JWKS_URL_ENV) {
            Some(url) => url,
            None => default_jwks_url(&issuer)?,
        };

        let jwks_cache_ttl = match get(AUTH_JWKS_CACHE_TTL_ENV) {
            Some(raw) => Duration::from_secs(raw.parse().map_err(
                |e: std::num::ParseIntError| ConfigError::Invalid {
                    name: AUTH_JWKS_CACHE_TTL_ENV,
                    reason: e.to_string(),
                },
            )?),
            None => DEFAULT_JWKS_CACHE_TTL,
        };

        let jwks_requests_per_minute = match get(AUTH_JWKS_RPM_ENV) {
            Some(raw) => {
                let value: u32 = raw.parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        name: AUTH_JWKS_RPM_ENV,
                        reason: e.to_string(),
                    }
                })?;
                if value == 0 {
                    return Err(ConfigError::Invalid {
                        name: AUTH_JWKS_RPM_ENV,
                        reason: "must be at least 1".to_string(),
                    });
                }
                value
            }
            None => DEFAULT_JWKS_REQUESTS_PER_MINUTE,
        };

        let bootstrap = match (get(BOOTSTRAP_SUBJECT_ENV), get(BOOTSTRAP_EMAIL_ENV)) {
            (Some(subject), Some(email)) => Some(BootstrapSettings {
                subject,
                email,
                name: get(BOOTSTRAP_NAME_ENV).unwrap_or_else(|| DEFAULT_BOOTSTRAP_NAME.to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(BOOTSTRAP_EMAIL_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(BOOTSTRAP_SUBJECT_ENV)),
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            auth: AuthSettings {
                issuer,
                audience: get(AUTH_AUDIENCE_ENV),
                jwks_url,
                jwks_cache_ttl,
                jwks_requests_per_minute,
                subject_prefix: get(AUTH_SUBJECT_PREFIX_ENV)
                    .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
            },
            bootstrap,
        })
    }
}

/// Derive the conventional JWKS location from an issuer URL.
fn default_jwks_url(issuer: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: AUTH_ISSUER_ENV,
        reason,
    };
    let mut base = Url::parse(issuer).map_err(|e| invalid(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(".well-known/jwks.json")
        .map(String::from)
        .map_err(|e| invalid(e.to_string()))
}
