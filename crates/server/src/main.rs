use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod answer;
mod chat;
mod config;
mod db;
mod error;
mod identity;
mod routes;
mod state;

use answer::HttpAnswerClient;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env may carry RUST_LOG and SCHOLAR_HUB_CONFIG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholar_hub_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!(
        "Starting Scholar Hub server on {}:{}",
        config.server.host,
        config.server.port
    );

    // Initialize database
    let db = db::Database::new(&config.database.path).await?;
    db.run_migrations().await?;

    let answers = Arc::new(HttpAnswerClient::new(&config.answer_service)?);
    tracing::info!("Answer service at {}", config.answer_service.url);

    // Create app state
    let state = AppState::new(db, &config, answers);

    // Build router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
