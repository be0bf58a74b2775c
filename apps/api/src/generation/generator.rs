//! Generation Stage — submits an assembled prompt with a kind's preset.
//!
//! Two shapes of the same call: `generate` returns the finished text,
//! `generate_stream` returns the provider's fragments in emission order and
//! leaves accumulation to the caller (see `GeneratedText`).

use tracing::debug;

use crate::errors::AppError;
use crate::generation::assembler::PromptPair;
use crate::generation::presets::GenerationParams;
use crate::llm_client::{CompletionBackend, CompletionRequest, FragmentStream};

/// Accumulator owned by one generation invocation. Fragments are only ever
/// appended; `finish` freezes the result.
#[derive(Debug, Default)]
pub struct GeneratedText {
    text: String,
    fragments: usize,
}

impl GeneratedText {
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn finish(self) -> String {
        self.text
    }
}

pub fn completion_request(prompt: &PromptPair, params: GenerationParams) -> CompletionRequest {
    CompletionRequest {
        system: prompt.system.clone(),
        user: prompt.user.clone(),
        model: params.model.to_string(),
        temperature: params.temperature,
        max_output_tokens: params.max_output_tokens,
        top_p: params.top_p,
    }
}

/// Non-streaming generation: one request, one string.
pub async fn generate(
    backend: &dyn CompletionBackend,
    prompt: &PromptPair,
    params: GenerationParams,
) -> Result<String, AppError> {
    debug!("Generating with model {}", params.model);
    let text = backend.complete(&completion_request(prompt, params)).await?;
    Ok(text)
}

/// Streaming generation. The returned stream is finite and not restartable.
pub async fn generate_stream(
    backend: &dyn CompletionBackend,
    prompt: &PromptPair,
    params: GenerationParams,
) -> Result<FragmentStream, AppError> {
    debug!("Streaming generation with model {}", params.model);
    let fragments = backend.stream(&completion_request(prompt, params)).await?;
    Ok(fragments)
}
