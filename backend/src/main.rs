use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vaccination_tracker_backend::{config::Config, create_router, initialize_backend};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let addr = config.socket_addr()?;

    let state = initialize_backend(&config).await?;
    let app = create_router(state, &config.cors_origin)?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
