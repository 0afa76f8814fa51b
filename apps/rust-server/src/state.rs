// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::accounts::{AccountLifecycle, GrantManager, Readiness, RoleManager};
use crate::auth::policy::PolicyTable;
use crate::auth::resolver::IdentityResolver;
use crate::auth::verifier::TokenVerifier;
use crate::storage::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub verifier: Arc<TokenVerifier>,
    pub policies: Arc<PolicyTable>,
    pub readiness: Readiness,
    subject_prefix: Arc<str>,
}

impl AppState {
    /// Build state with the service's route policy table.
    pub fn new(
        store: Arc<Store>,
        verifier: TokenVerifier,
        readiness: Readiness,
        subject_prefix: &str,
    ) -> Self {
        Self {
            store,
            verifier: Arc::new(verifier),
            policies: Arc::new(crate::api::policy_table()),
            readiness,
            subject_prefix: Arc::from(subject_prefix),
        }
    }

    pub fn accounts(&self) -> AccountLifecycle<'_> {
        AccountLifecycle::new(&self.store, &self.subject_prefix)
    }

    pub fn roles(&self) -> RoleManager<'_> {
        RoleManager::new(&self.store)
    }

    pub fn grants(&self) -> GrantManager<'_> {
        GrantManager::new(&self.store, &self.subject_prefix)
    }

    pub fn resolver(&self) -> IdentityResolver<'_> {
        IdentityResolver::new(&self.store, &self.subject_prefix)
    }
}
