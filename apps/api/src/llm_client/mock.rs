//! Scripted completion backend for deterministic tests.
//!
//! Replies are queued and consumed in call order; every request is recorded
//! so tests can assert on call counts and prompt contents.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{CompletionBackend, CompletionRequest, FragmentStream, LlmError};

/// One canned reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Delivered as the given fragments (or their concatenation when not streaming).
    Fragments(Vec<String>),
    /// Fails before any output.
    Fail { status: u16, message: String },
    /// Streams the fragments, then fails.
    FailAfter(Vec<String>, String),
}

impl Scripted {
    pub fn text(text: &str) -> Self {
        Scripted::Fragments(vec![text.to_string()])
    }

    pub fn fragments(parts: &[&str]) -> Self {
        Scripted::Fragments(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn fail(status: u16, message: &str) -> Self {
        Scripted::Fail {
            status,
            message: message.to_string(),
        }
    }
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: CompletionRequest,
    pub streamed: bool,
}

#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Scripted>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, request: &CompletionRequest, streamed: bool) -> Scripted {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            streamed,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Scripted::fail(500, "no scripted reply left"))
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        match self.next(request, false) {
            Scripted::Fragments(parts) => Ok(parts.concat()),
            Scripted::Fail { status, message } => Err(LlmError::Api { status, message }),
            Scripted::FailAfter(_, message) => Err(LlmError::Stream(message)),
        }
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, LlmError> {
        match self.next(request, true) {
            Scripted::Fragments(parts) => {
                let items = parts.into_iter().map(Ok::<String, LlmError>);
                Ok(stream::iter(items).boxed())
            }
            Scripted::Fail { status, message } => Err(LlmError::Api { status, message }),
            Scripted::FailAfter(parts, message) => {
                let items = parts
                    .into_iter()
                    .map(Ok::<String, LlmError>)
                    .chain(std::iter::once(Err(LlmError::Stream(message))));
                Ok(stream::iter(items).boxed())
            }
        }
    }
}
