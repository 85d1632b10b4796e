use std::sync::Arc;

use acquisition_service::api::{build_router, AppState};
use acquisition_service::config::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = AppConfig::from_env();
    let port = config.port;
    let cache_enabled = config.cache_enabled();

    let state = Arc::new(AppState::from_config(config).await);
    let router = build_router(state);

    tracing::info!(port, cache_enabled, "starting acquisition service");

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
