use std::sync::Arc;

use db::DBService;
use server::{AppState, config::ServerConfig, mail::LogMailer, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();

    let config = ServerConfig::from_env()?;
    let db = DBService::new(&config.database_url).await?;

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let state = AppState::new(db, config, Arc::new(LogMailer));
    axum::serve(listener, routes::router(state)).await?;

    Ok(())
}
