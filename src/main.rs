use chatroom::{config, routes, state};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::ServerConfig::from_env();
    tracing::info!(
        inactivity_secs = config.store.inactivity.as_secs(),
        retention_cap = config.store.retention_cap,
        retention_keep = config.store.retention_keep,
        recent_limit = config.store.recent_limit,
        "chat store configured"
    );

    let state = state::AppState::new(config.store);
    let app = routes::app(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "chatroom listening");
    axum::serve(listener, app).await?;
    Ok(())
}
