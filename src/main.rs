//! Arcade Engine Server - Authoritative server for hardware-controlled mini-games
//!
//! This is the main entry point. It runs:
//! - a raw TCP listener for hardware controllers
//! - WebSocket + HTTP endpoints for browser observers
//! - the fixed-rate tick loop that simulates and broadcasts

mod app;
mod config;
mod engine;
mod game;
mod hardware;
mod http;
mod store;
mod util;
mod ws;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::engine::TickScheduler;
use crate::hardware::serve_hardware;
use crate::http::build_router;
use crate::store::LedgerWriter;
use crate::util::time::{init_server_time, tick_period};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Arcade Engine Server");
    info!(
        tick_rate_hz = config.tick_rate_hz,
        tokens = config.hardware_tokens.len(),
        "Engine configuration loaded"
    );

    // Create application state
    let state = AppState::new(config.clone());

    // Spawn tick loop
    let ledger_writer = LedgerWriter::spawn(state.ledger.clone());
    let scheduler = TickScheduler::new(
        state.engine.clone(),
        ledger_writer,
        tick_period(config.tick_rate_hz),
    );
    tokio::spawn(scheduler.run());

    // Spawn hardware listener
    let hardware_listener = TcpListener::bind(config.hardware_addr).await?;
    tokio::spawn(serve_hardware(
        hardware_listener,
        state.engine.clone(),
        state.hardware.clone(),
    ));

    // Build router
    let router = build_router(state);

    // Start server
    let listener = TcpListener::bind(config.server_addr).await?;

    info!("Server listening on {}", config.server_addr);
    info!("Hardware controllers on {}", config.hardware_addr);
    info!("Health check: http://{}/health", config.server_addr);
    info!("WebSocket endpoint: ws://{}/ws", config.server_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
