use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionBackend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Completion provider. `LlmClient` in production, a scripted double in tests.
    pub backend: Arc<dyn CompletionBackend>,
    pub config: Config,
}
