// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use faucet_server::{
    api::router,
    auth::{doorman::DEFAULT_DOORMAN_TIMEOUT, DoormanClient},
    config::{ConfigError, NetworkLayout, Settings, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    faucet::Faucet,
    loader,
    state::AppState,
    storage::{BalanceDb, LEDGER_FILE},
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open ledger: {0}")]
    Ledger(#[from] faucet_server::storage::LedgerError),

    #[error("invalid bind address {0}")]
    BindAddress(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

async fn run() -> Result<(), StartupError> {
    let settings = Settings::from_env()?;
    let layout = NetworkLayout::load(&settings.layout_path)?;
    info!(path = %settings.layout_path.display(), "Network layout loaded");

    let networks = loader::load(&layout, &settings.secrets, settings.rpc_timeout).await?;

    let ledger_path = settings.data_dir.join(LEDGER_FILE);
    let ledger = BalanceDb::open(&ledger_path)?;
    info!(path = %ledger_path.display(), "Balance ledger opened");

    let doorman = match settings.doorman_url.as_deref() {
        Some(url) => Some(DoormanClient::new(url, DEFAULT_DOORMAN_TIMEOUT)?),
        None => {
            tracing::warn!("DOORMAN_URL not set, authenticated endpoints will reject requests");
            None
        }
    };

    let faucet = Faucet::new(networks.chains, networks.tokens, Arc::new(ledger));
    let state = AppState::new(faucet, doorman).with_data_dir(&settings.data_dir);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|_| StartupError::BindAddress(format!("{}:{}", settings.host, settings.port)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Faucet server listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    info!("Faucet server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Faucet server failed");
            ExitCode::FAILURE
        }
    }
}
