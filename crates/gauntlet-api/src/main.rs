//! Gauntlet API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use gauntlet_api::config::Config;
use gauntlet_api::error::AppError;
use gauntlet_api::routes;
use gauntlet_api::state::AppState;
use gauntlet_battle::domain::boss_table::BossTableHandle;
use gauntlet_core::clock::SystemClock;
use gauntlet_core::tenant::TenantRouter;
use gauntlet_store::SqliteStoreOpener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting gauntlet API server");

    // Read configuration from environment.
    let config = Config::from_env()?;

    // Load the boss table; a bad table is fatal at startup.
    let boss_tables = BossTableHandle::new(config.boss_table.load()?);
    tracing::info!(
        path = %config.boss_table.path.display(),
        region = %config.boss_table.region,
        "boss table loaded"
    );

    // Tenant databases are opened lazily on first request.
    let opener = Arc::new(SqliteStoreOpener::in_directory(&config.data_dir));
    let tenants = Arc::new(TenantRouter::new(opener));

    // Build application state.
    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::clone(&tenants),
        boss_tables,
        Some(config.boss_table.clone()),
    );

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::app_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tenants.close_all().await?;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
