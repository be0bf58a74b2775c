//! Axum route handlers for the Generation API.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::AppError;
use crate::generation::assembler::{targeted_questions, GenerationRequest};
use crate::generation::pipeline::{run_flow, stream_flow, FlowEvent, FlowOutput};
use crate::generation::presets::{ContentKind, GenerationParams};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QuestionsRequest {
    #[serde(default)]
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: String,
}

#[derive(Debug, Serialize)]
pub struct PresetResponse {
    pub kind: ContentKind,
    #[serde(flatten)]
    pub params: GenerationParams,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/questions
///
/// Returns the clarifying questions for a topic. No LLM call.
pub async fn handle_questions(Json(request): Json<QuestionsRequest>) -> Json<QuestionsResponse> {
    Json(QuestionsResponse {
        questions: targeted_questions(&request.topic),
    })
}

/// GET /api/v1/presets/:kind
pub async fn handle_preset(Path(kind): Path<String>) -> Result<Json<PresetResponse>, AppError> {
    let kind: ContentKind = kind.parse()?;
    Ok(Json(PresetResponse {
        kind,
        params: kind.preset(),
    }))
}

/// POST /api/v1/posts/:kind/generate
///
/// Runs the whole flow with a non-streaming generation call. Warnings and
/// provider faults come back as 200 with the message in `text`.
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<FlowOutput>, AppError> {
    let kind: ContentKind = kind.parse()?;
    let output = run_flow(state.backend.as_ref(), kind, &request).await;
    Ok(Json(output))
}

/// POST /api/v1/posts/:kind/stream
///
/// Server-sent events: one `pending`, then `fragment` events as the text is
/// generated, then exactly one `done` carrying the final text and score.
pub async fn handle_stream(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<GenerationRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let kind: ContentKind = kind.parse()?;
    let events = stream_flow(state.backend.clone(), kind, request)
        .map(|event| Ok::<_, Infallible>(sse_event(event)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Maps a flow event onto a named SSE event with a JSON payload.
fn sse_event(event: FlowEvent) -> Event {
    let (name, data) = match event {
        FlowEvent::Pending { score } => ("pending", json!({ "score": score })),
        FlowEvent::Fragment(delta) => ("fragment", json!({ "delta": delta })),
        FlowEvent::Done(output) => ("done", json!({ "text": output.text, "score": output.score })),
    };
    Event::default().event(name).data(data.to_string())
}
