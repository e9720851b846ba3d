//! Evently web server.
//!
//! This binary:
//! - Receives Clerk user webhooks and mirrors them into the user store
//! - Links newly created users back to Clerk through public metadata
//! - Gates every other route behind a session check

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use evently::{
    router, AppState, ClerkClient, Config, Gatekeeper, MemoryUserStore, RouteGate,
    SessionPresenceGuard,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        webhook_secret_configured = config.webhook_secret().is_some(),
        clerk_secret_key_configured = config.clerk_secret_key.is_some(),
        clerk_api_url = %config.clerk_api_url,
        webhook_tolerance_secs = config.webhook_tolerance_secs,
        "config_loaded"
    );

    let identity = ClerkClient::new(
        &config.clerk_api_url,
        config.clerk_secret_key.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )
    .context("Failed to build Clerk client")?;

    let gate = RouteGate::standard().context("Invalid route patterns")?;
    let guard = SessionPresenceGuard::new(config.sign_in_url.clone());
    let gatekeeper = Gatekeeper::new(gate, Arc::new(guard));

    let state = AppState::new(
        config.clone(),
        Arc::new(MemoryUserStore::new()),
        Arc::new(identity),
        gatekeeper,
    );

    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
