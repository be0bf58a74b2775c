mod config;
mod errors;
mod generation;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::presets::{LINKEDIN_PRESET, TWEET_PRESET};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Postcraft v{}", env!("CARGO_PKG_VERSION"));

    if !config.has_api_key() {
        warn!("GROQ_API_KEY is not set; generation requests will fail until it is");
    }

    let llm = LlmClient::new(
        config.groq_api_key.clone(),
        config.groq_api_url.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?
    .with_retry_base_delay(Duration::from_millis(config.llm_retry_delay_ms));
    info!(
        "LLM client initialized (linkedin: {}, tweet: {})",
        LINKEDIN_PRESET.model, TWEET_PRESET.model
    );

    let state = AppState {
        backend: Arc::new(llm),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
