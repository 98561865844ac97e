//! folio server: application entry point.

use folio_core::error::FolioError;
use folio_db::{DbManager, run_migrations};
use folio_server::{ApiResult, AppState, ServerConfig, TokenVerifier, create_router};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ApiResult<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("folio=info,tower_http=info")),
        )
        .json()
        .init();

    let config = ServerConfig::from_env()?;
    info!(bind_address = %config.bind_address, "Starting folio server");

    let db = DbManager::connect(&config.db).await?;
    run_migrations(db.client()).await.map_err(FolioError::from)?;
    info!("Database migrations complete");

    let verifier = TokenVerifier::new(&config.jwt_public_key_pem, &config.jwt_issuer)?;
    let state = AppState::new(db.client().clone(), config.access.clone(), verifier);
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("folio server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
