mod assessment;
mod auth;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{InferenceClient, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgAssessmentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Assessment API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL-backed store
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    let store = Arc::new(PgAssessmentStore::new(pool));

    // Initialize inference client
    let llm = LlmClient::new(config.llm_settings())?;
    info!(
        "Inference client initialized (model: {}, temperature: {})",
        llm.model(),
        llm.temperature()
    );
    info!(
        "Batch settings: concurrency {}, deadline {:?}, corpus prompt limit {}",
        config.pipeline.batch_concurrency,
        config.pipeline.batch_deadline,
        config.pipeline.corpus_prompt_limit
    );

    let state = AppState {
        store,
        inference: Arc::new(llm),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
