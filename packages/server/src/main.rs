use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fieldbook_server::config::AppConfig;
use fieldbook_server::enrichment::Enrichment;
use fieldbook_server::state::AppState;
use fieldbook_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("loading configuration")?;

    let db = database::init_db(&config.database)
        .await
        .context("connecting to database")?;
    seed::ensure_indexes(&db).await?;
    seed::seed_bootstrap_admin(&db, &config.auth).await?;

    let enrichment = Enrichment::from_config(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;

    let state = AppState {
        db,
        config: Arc::new(config),
        enrichment: Arc::new(enrichment),
    };
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
