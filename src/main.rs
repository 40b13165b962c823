use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use api_panel_rust::config::{self, StoreBackend};
use api_panel_rust::database::{DatabaseManager, MemoryStore, PanelStore, PgStore};
use api_panel_rust::handlers;
use api_panel_rust::is_development;
use api_panel_rust::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECURITY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .init();

    let config = config::config();
    tracing::info!("Starting API panel in {:?} mode", config.environment);
    if is_development!() {
        tracing::warn!("Development mode: built-in JWT secret and permissive defaults are active");
    }

    let store: Arc<dyn PanelStore> = match config.store {
        StoreBackend::Postgres => Arc::new(PgStore::new(DatabaseManager::pool(config).await?)),
        StoreBackend::Memory => match std::env::var("PANEL_MEMORY_FIXTURE") {
            Ok(path) => {
                tracing::info!("Loading in-memory store from {}", path);
                Arc::new(MemoryStore::from_fixture(&path)?)
            }
            Err(_) => Arc::new(MemoryStore::new()),
        },
    };

    let app = handlers::router(AppState::new(store, config));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("API panel listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
