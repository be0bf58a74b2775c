//! Scoring Stage — asks the model to rate a finished text's engagement potential.
//!
//! Never fails: blank input and provider faults both map to sentinel strings.

use tracing::{debug, warn};

use crate::generation::assembler::{assemble, PromptKind};
use crate::generation::generator::completion_request;
use crate::generation::presets::SCORING_PRESET;
use crate::llm_client::CompletionBackend;

/// Only this many leading characters of a text are sent for rating.
pub const SCORE_PREFIX_CHARS: usize = 500;

pub const NOTHING_TO_SCORE: &str = "No content generated yet.";
pub const SCORE_UNAVAILABLE: &str = "Could not calculate score.";
/// Shown while a streaming flow is still producing text.
pub const SCORE_PENDING: &str = "Calculating...";

/// The first `SCORE_PREFIX_CHARS` characters of `text`.
pub fn score_prefix(text: &str) -> &str {
    match text.char_indices().nth(SCORE_PREFIX_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

pub async fn score_engagement(backend: &dyn CompletionBackend, text: &str) -> String {
    if text.trim().is_empty() {
        return NOTHING_TO_SCORE.to_string();
    }

    let prompt = assemble(PromptKind::EngagementScore, score_prefix(text), None, None);
    let request = completion_request(&prompt, SCORING_PRESET);

    match backend.complete(&request).await {
        Ok(score) if !score.trim().is_empty() => {
            debug!("Engagement score: {}", score.trim());
            score.trim().to_string()
        }
        Ok(_) => {
            warn!("Engagement scoring returned an empty reply");
            SCORE_UNAVAILABLE.to_string()
        }
        Err(e) => {
            warn!("Engagement scoring failed: {e}");
            SCORE_UNAVAILABLE.to_string()
        }
    }
}
