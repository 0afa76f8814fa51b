// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication and Authorization
//!
//! ## Request Flow
//!
//! 1. Client authenticates with the external identity provider
//! 2. Client sends `Authorization: Bearer <JWT>`
//! 3. The server, for routes listed in the policy table:
//!    - Fetches the provider JWKS via HTTPS (cached, rate-limited)
//!    - Verifies signature, expiry, issuer, audience and subject
//!    - Resolves `sub` to a stored account (active, not blocked)
//!    - Checks the route's allowed roles
//!    - Checks the route's required admin permissions
//!
//! ## Security
//!
//! - Routes absent from the policy table are public
//! - Every authentication failure returns the same 401 body
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gates;
pub mod jwks;
pub mod middleware;
pub mod policy;
pub mod resolver;
pub mod roles;
pub mod verifier;

pub use claims::{IdentityClaims, VerifiedToken};
pub use error::AuthError;
pub use extractor::{CurrentAccount, VerifiedIdentity};
pub use jwks::JwksManager;
pub use middleware::authorize;
pub use policy::{Access, Permission, PolicyTable, RoutePolicy};
pub use resolver::IdentityResolver;
pub use roles::Role;
pub use verifier::TokenVerifier;
