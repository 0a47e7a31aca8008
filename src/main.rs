//! Battleship Server - two-player line-protocol game server
//!
//! This is the main entry point. It handles:
//! - TCP connections speaking the newline-delimited game protocol
//! - Pairing logged-in players into sessions
//! - A read-only HTTP status surface (health, live sessions)

mod app;
mod config;
mod game;
mod http;
mod matchmaking;
mod net;
mod util;

use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;
use crate::util::time::init_server_time;

/// How long connected clients get to flush their final QUIT
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);
    for warning in &config.warnings {
        warn!("{warning}");
    }

    // Initialize server time tracking
    init_server_time();

    info!("Starting Battleship Server");

    // Create application state
    let state = AppState::new(config.clone());

    // Status server
    if let Some(status_addr) = config.status_addr {
        let status_listener = TcpListener::bind(status_addr).await?;
        let router = build_router(state.clone());
        info!("Health check: http://{}/health", status_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(status_listener, router).await {
                error!(error = %e, "Status server stopped");
            }
        });
    }

    // Game server
    let listener = TcpListener::bind(config.game_addr()).await?;
    info!("Game server listening on {}", listener.local_addr()?);

    tokio::select! {
        _ = net::serve(listener, state.clone()) => {}
        _ = shutdown_signal() => {}
    }

    // Accept loop is gone; say goodbye to everyone still connected
    net::close_all(&state, SHUTDOWN_GRACE).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
