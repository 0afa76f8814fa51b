// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use comic_rust_server::{
    accounts::{bootstrap, open_store_with_backoff, Readiness, RoleManager},
    api::router,
    auth::TokenVerifier,
    config::Settings,
    state::AppState,
    telemetry,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Store open attempts before giving up.
const STORE_OPEN_ATTEMPTS: u32 = 8;
const STORE_OPEN_INITIAL_DELAY: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let readiness = Readiness::new();

    let store = Arc::new(
        open_store_with_backoff(
            &settings.database_path(),
            STORE_OPEN_ATTEMPTS,
            STORE_OPEN_INITIAL_DELAY,
        )
        .await?,
    );

    if let Some(bootstrap_settings) = settings.bootstrap.clone() {
        tokio::spawn(bootstrap::run_when_ready(
            store.clone(),
            bootstrap_settings,
            settings.auth.subject_prefix.clone(),
            readiness.clone(),
        ));
    } else {
        warn!("No bootstrap account configured");
    }

    RoleManager::new(&store).seed_well_known()?;
    readiness.mark_ready();

    let verifier = TokenVerifier::from_settings(&settings.auth)?;
    let state = AppState::new(store, verifier, readiness, &settings.auth.subject_prefix);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, issuer = %settings.auth.issuer, "Comic server listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
