//! Binary entrypoint for the Vantage HTTP server.
//!
//! Configuration comes from environment variables; see
//! [`vantage_server::config`].

use vantage_server::config::ServerConfig;
use vantage_server::router::build_router;
use vantage_server::state::AppState;
use vantage_server::worker::spawn_queue_consumer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let state = AppState::new(&config)?;
    spawn_queue_consumer(state.clone(), config.queue_interval);

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(db = %config.db_path, "vantage server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
