use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hashbin_common::reconcile::run_reconciler;
use hashbin_server::config::AppConfig;
use hashbin_server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    if config.auth.users.is_empty() {
        tracing::warn!("No users configured in auth.users; uploads and deletes will be rejected");
    }

    let engine = hashbin_server::build_engine(&config)
        .await
        .context("Failed to open storage")?;
    info!(root = %config.storage.root.display(), "Storage ready");

    if config.reconcile.enabled {
        tokio::spawn(run_reconciler(engine.clone(), config.reconcile.clone()));
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;

    let state = AppState {
        engine,
        config: Arc::new(config),
    };
    let app = hashbin_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
