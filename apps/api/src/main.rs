mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod persistence;
mod resume;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::interview::evaluator::{Evaluator, LlmEvaluator, OfflineEvaluator};
use crate::interview::InterviewService;
use crate::llm_client::LlmClient;
use crate::persistence::{InterviewRepository, MemoryRepository, PgRepository};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails only on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting interviewer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize persistence (PostgreSQL, or memory when DATABASE_URL is unset)
    let repo: Arc<dyn InterviewRepository> = match &config.database_url {
        Some(url) => Arc::new(PgRepository::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; interviews will not survive a restart");
            Arc::new(MemoryRepository::new())
        }
    };

    // Initialize evaluator (every call falls back when no API key is configured)
    let evaluator: Arc<dyn Evaluator> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone(), config.evaluator_timeout)?;
            info!("LLM evaluator initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmEvaluator::new(llm))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; using fallback questions and scores");
            Arc::new(OfflineEvaluator)
        }
    };

    // Restore the interview that was running before the last shutdown
    let interview = InterviewService::new(repo.clone(), evaluator, config.evaluator_timeout);
    interview.restore().await?;

    // Build app state
    let state = AppState {
        config: config.clone(),
        interview,
        repo,
    };

    // Build router
    // TODO: restrict CORS origins once the candidate UI has a fixed host
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
