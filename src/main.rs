//! Tenant Settings - settings server
//!
//! Serves the settings engine over HTTP with an in-memory cache backend.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_settings::{create_router, spawn_cleanup_task, AppState, Config, SettingsMap};

/// Main entry point for the settings server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the settings store and build the engine
/// 4. Install missing global defaults, if a defaults file is configured
/// 5. Start background cache cleanup task
/// 6. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenant_settings=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tenant Settings Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: store={:?}, cache_enabled={}, cache_ttl={}s, tenancy_mode={:?}, port={}",
        config.store,
        config.cache_enabled,
        config.cache_ttl_seconds,
        config.tenancy_mode,
        config.server_port
    );

    let mut state = AppState::from_config(&config).context("failed to open settings store")?;
    info!("Settings engine initialized");

    if let Some(path) = &config.defaults_file {
        let defaults = load_defaults(path)?;
        let report = state
            .engine
            .install_defaults(&defaults, false)
            .context("failed to install default settings")?;
        info!(
            installed = report.installed,
            skipped = report.skipped,
            "Default settings installed from {}",
            path.display()
        );
        state = state.with_defaults(defaults);
    }

    let cleanup_handle = spawn_cleanup_task(
        state.backend.clone(),
        state.engine.cache().clone(),
        config.cleanup_interval,
    );
    info!("Background cleanup task started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Reads a JSON object of defaults: bare values or `{"value", "description"}` entries.
fn load_defaults(path: &Path) -> anyhow::Result<SettingsMap> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read defaults file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("defaults file {} is not a JSON object", path.display()))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the cleanup task.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
