// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Store readiness signalling.
//!
//! Startup opens the store (retrying with backoff), seeds roles and then
//! flips the readiness flag. Tasks that need a usable store await
//! [`Readiness::wait`] instead of sleeping for a fixed time.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::storage::{Store, StoreResult};

/// Upper bound for the delay between open attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Shared ready/not-ready flag.
#[derive(Clone)]
pub struct Readiness {
    tx: Arc<watch::Sender<bool>>,
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the store is ready.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Open the store, retrying with exponential backoff.
pub async fn open_store_with_backoff(
    path: &Path,
    max_attempts: u32,
    initial_delay: Duration,
) -> StoreResult<Store> {
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match Store::open(path) {
            Ok(store) => {
                info!(path = %path.display(), attempt, "Store opened");
                return Ok(store);
            }
            Err(e) if attempt < max_attempts => {
                warn!(error = %e, attempt, retry_in_ms = delay.as_millis() as u64, "Store not ready, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
