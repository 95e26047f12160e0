use axum::Router;
use std::net::SocketAddr;
use tracing::{error, info};

use sql_gateway_backend::api;
use sql_gateway_backend::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        "Starting SQL gateway on {} (dialect: {})",
        config.server_address(),
        config.engine.dialect
    );

    // Build the engine, parser, dispatcher and session properties
    let state = api::routes::create_app_state(config.clone()).map_err(|e| {
        error!("Failed to initialize statement service: {}", e);
        e
    })?;

    // Create router with state
    let app: Router = api::routes::create_router_with_state(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
