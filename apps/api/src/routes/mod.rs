pub mod health;
pub mod ui;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index_handler))
        .route("/health", get(health::health_handler))
        .route("/api/v1/questions", post(handlers::handle_questions))
        .route("/api/v1/presets/:kind", get(handlers::handle_preset))
        .route(
            "/api/v1/posts/:kind/generate",
            post(handlers::handle_generate),
        )
        .route("/api/v1/posts/:kind/stream", post(handlers::handle_stream))
        .with_state(state)
}
