//! patchbay server — application entry point.

use std::net::SocketAddr;

use anyhow::Result;
use patchbay_db::DbManager;
use patchbay_server::{AppState, ServerConfig, router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("patchbay=info".parse()?),
        )
        .json()
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Starting patchbay server...");

    let db = DbManager::connect(&config.db_config()).await?;
    patchbay_db::run_migrations(db.client()).await?;

    let state = AppState::new(
        db.client().clone(),
        config.resolver_config(),
        config.cnam_credentials(),
    );
    if config.cnam_credentials().is_none() {
        tracing::info!("CNAM credentials absent, enrichment disabled");
    }

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "patchbay listening");
    axum::serve(listener, app).await?;

    Ok(())
}
