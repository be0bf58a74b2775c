use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and whether an API key is set.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "postcraft",
        "llm_configured": state.config.has_api_key()
    }))
}
