//! Incremental parser for the provider's server-sent-event stream.
//!
//! Bytes arrive in arbitrary chunks; a line is only decoded once its `\n`
//! has arrived, so multi-byte characters split across chunks survive intact.

use serde::Deserialize;

use super::{ApiErrorBody, LlmError};

/// One meaningful event extracted from a `data:` line.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Fragment(String),
    Done,
    Error(String),
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Splits a byte stream into complete lines.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Appends a chunk and returns every line it completed, without the
    /// trailing `\r\n` / `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Returns the unterminated tail, if any, once the byte stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
        (!line.trim().is_empty()).then_some(line)
    }
}

/// Parses one SSE line. Comments, blank lines, non-`data` fields and
/// deltas without text yield `None`.
pub fn parse_line(line: &str) -> Result<Option<SseEvent>, LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();

    if data.is_empty() {
        return Ok(None);
    }
    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let payload: StreamPayload = serde_json::from_str(data)?;

    if let Some(error) = payload.error {
        return Ok(Some(SseEvent::Error(error.message)));
    }

    Ok(payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .map(SseEvent::Fragment))
}
