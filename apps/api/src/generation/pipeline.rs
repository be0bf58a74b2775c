//! Flow orchestration — assemble → generate → score for one user action.
//!
//! A flow never fails: a missing topic becomes a warning, a provider fault
//! becomes an error string in the text field, and scoring always yields a
//! string. LinkedIn and tweet flows are the same code with a different
//! `ContentKind`.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::assembler::{assemble_generation, GenerationRequest};
use crate::generation::generator::{generate, generate_stream, GeneratedText};
use crate::generation::presets::ContentKind;
use crate::generation::scoring::{score_engagement, SCORE_PENDING};
use crate::llm_client::{receiver_stream, CompletionBackend};

const FLOW_EVENT_CAPACITY: usize = 64;

/// What a finished action writes into its two output fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowOutput {
    pub text: String,
    pub score: String,
}

impl FlowOutput {
    fn warning(err: &AppError) -> Self {
        Self {
            text: err.to_string(),
            score: String::new(),
        }
    }

    fn failed(kind: ContentKind, err: &AppError) -> Self {
        Self {
            text: format!("Error generating {}: {err}", kind.label()),
            score: String::new(),
        }
    }
}

/// Progress of a streaming flow, in the order the UI should apply it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Generation has been requested; the score field shows a placeholder.
    Pending { score: String },
    /// One fragment to append to the text field.
    Fragment(String),
    /// Final values of both fields. Always the last event.
    Done(FlowOutput),
}

/// Runs a flow with a non-streaming generation call.
pub async fn run_flow(
    backend: &dyn CompletionBackend,
    kind: ContentKind,
    request: &GenerationRequest,
) -> FlowOutput {
    let span = info_span!("flow", flow_id = %Uuid::new_v4(), kind = %kind, streaming = false);
    async {
        let prompt = match assemble_generation(kind, request) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Rejected {kind} request: {e}");
                return FlowOutput::warning(&e);
            }
        };

        let text = match generate(backend, &prompt, kind.preset()).await {
            Ok(text) => text,
            Err(e) => {
                error!("Generation failed: {e}");
                return FlowOutput::failed(kind, &e);
            }
        };

        let score = score_engagement(backend, &text).await;
        info!("Flow finished: {} chars", text.chars().count());
        FlowOutput { text, score }
    }
    .instrument(span)
    .await
}

/// Runs a flow with a streaming generation call on a background task and
/// returns its events. The flow runs to completion even if the consumer
/// stops listening.
pub fn stream_flow(
    backend: Arc<dyn CompletionBackend>,
    kind: ContentKind,
    request: GenerationRequest,
) -> BoxStream<'static, FlowEvent> {
    let (tx, rx) = mpsc::channel::<FlowEvent>(FLOW_EVENT_CAPACITY);
    let span = info_span!("flow", flow_id = %Uuid::new_v4(), kind = %kind, streaming = true);

    tokio::spawn(
        async move {
            let output = drive_stream(backend.as_ref(), kind, &request, &tx).await;
            let _ = tx.send(FlowEvent::Done(output)).await;
        }
        .instrument(span),
    );

    receiver_stream(rx)
}

async fn drive_stream(
    backend: &dyn CompletionBackend,
    kind: ContentKind,
    request: &GenerationRequest,
    tx: &mpsc::Sender<FlowEvent>,
) -> FlowOutput {
    let prompt = match assemble_generation(kind, request) {
        Ok(prompt) => prompt,
        Err(e) => {
            warn!("Rejected {kind} request: {e}");
            return FlowOutput::warning(&e);
        }
    };

    let _ = tx
        .send(FlowEvent::Pending {
            score: SCORE_PENDING.to_string(),
        })
        .await;

    let mut fragments = match generate_stream(backend, &prompt, kind.preset()).await {
        Ok(fragments) => fragments,
        Err(e) => {
            error!("Generation failed before streaming: {e}");
            return FlowOutput::failed(kind, &e);
        }
    };

    let mut text = GeneratedText::default();
    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(fragment) => {
                text.push(&fragment);
                let _ = tx.send(FlowEvent::Fragment(fragment)).await;
            }
            Err(e) => {
                let e = AppError::from(e);
                error!("Generation failed after {} fragments: {e}", text.fragments());
                return FlowOutput::failed(kind, &e);
            }
        }
    }

    info!("Stream finished: {} fragments", text.fragments());
    let text = text.finish();
    let score = score_engagement(backend, &text).await;
    FlowOutput { text, score }
}
