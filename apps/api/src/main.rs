//! Storefront API server binary.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use storefront_api::{build_router, init_tracing, shutdown_signal, AppConfig, AppState};
use storefront_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Storefront API server...");

    let config = AppConfig::load(None).context("Failed to load configuration")?;
    let addr = config.socket_addr()?;
    info!(
        %addr,
        db_path = %config.database.path.display(),
        dev_mode = config.server.dev_mode,
        "Configuration loaded"
    );

    if let Some(dir) = config.database.path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        }
    }

    let db = Database::new(config.db_config())
        .await
        .context("Failed to open database")?;

    let (total, applied) = db.migration_status().await?;
    info!(total, applied, "Database ready");

    let state = AppState::new(db.clone(), config);
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}
