//! LLM Client — the single point of entry for all chat-completion calls in Postcraft.
//!
//! Talks to Groq's OpenAI-compatible `chat/completions` endpoint. Stages never
//! hold this type directly; they receive an `Arc<dyn CompletionBackend>` so the
//! test suite can substitute a scripted double.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[cfg(test)]
pub mod mock;
pub mod sse;

use sse::{SseEvent, SseLineBuffer};

const MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Fragments buffered between the reader task and the consumer.
const FRAGMENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned no choices")]
    EmptyContent,

    #[error("Stream error: {0}")]
    Stream(String),
}

/// One chat-completion request: a system instruction, one user turn and the
/// sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

/// Lazy, finite sequence of text fragments in emission order.
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

/// The completion capability every stage depends on.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the whole completion at once.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Returns the completion as fragments. The stream ends when the provider
    /// signals end-of-output; a mid-stream fault is yielded as its last item.
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (OpenAI chat-completions format)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_completion_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(request: &'a CompletionRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_completion_tokens: request.max_output_tokens,
            top_p: request.top_p,
            stream,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub(crate) error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub(crate) message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP client
// ────────────────────────────────────────────────────────────────────────────

/// Groq chat-completions client with retry on rate limits and server errors.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    retry_base_delay: Duration,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            api_url,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        })
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Sends the request, retrying on 429, 5xx and transport errors with
    /// exponential backoff. Returns the first successful response, or the
    /// error of the last attempt.
    async fn send_with_retry(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<reqwest::Response, LlmError> {
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            attempt += 1;

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let error = match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = LlmError::Api {
                        status: status.as_u16(),
                        message: error_message(body),
                    };
                    if status.as_u16() != 429 && !status.is_server_error() {
                        return Err(error);
                    }
                    warn!("LLM API returned {status}: {error}");
                    error
                }
                Err(e) => LlmError::Http(e),
            };

            if attempt >= MAX_RETRIES {
                return Err(error);
            }
        }
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = ChatCompletionRequest::new(request, false);
        let response = self.send_with_retry(&body).await?;

        let text = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "LLM call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                request.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyContent)?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, LlmError> {
        let body = ChatCompletionRequest::new(request, true);
        let response = self.send_with_retry(&body).await?;

        let (tx, rx) = mpsc::channel::<Result<String, LlmError>>(FRAGMENT_CHANNEL_CAPACITY);
        let model = request.model.clone();

        tokio::spawn(async move {
            let mut bytes = Box::pin(response.bytes_stream());
            let mut lines = SseLineBuffer::default();
            let mut fragments = 0usize;
            let mut finished = false;

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::Http(e))).await;
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    match sse::parse_line(&line) {
                        Ok(Some(SseEvent::Fragment(text))) => {
                            fragments += 1;
                            if tx.send(Ok(text)).await.is_err() {
                                debug!("Fragment consumer went away; stopping stream");
                                return;
                            }
                        }
                        Ok(Some(SseEvent::Done)) => {
                            finished = true;
                            break 'read;
                        }
                        Ok(Some(SseEvent::Error(message))) => {
                            let _ = tx.send(Err(LlmError::Stream(message))).await;
                            return;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            if let Some(line) = lines.finish().filter(|_| !finished) {
                match sse::parse_line(&line) {
                    Ok(Some(SseEvent::Fragment(text))) => {
                        fragments += 1;
                        let _ = tx.send(Ok(text)).await;
                    }
                    Ok(Some(SseEvent::Done)) => finished = true,
                    Ok(Some(SseEvent::Error(message))) => {
                        let _ = tx.send(Err(LlmError::Stream(message))).await;
                        return;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }

            if !finished {
                warn!("LLM stream closed before [DONE]: model={model}, fragments={fragments}");
                let _ = tx
                    .send(Err(LlmError::Stream(
                        "stream ended before [DONE]".to_string(),
                    )))
                    .await;
                return;
            }

            debug!("LLM stream finished: model={model}, fragments={fragments}");
        });

        Ok(receiver_stream(rx))
    }
}

/// Adapts an mpsc receiver into a boxed stream.
pub(crate) fn receiver_stream<T: Send + 'static>(
    rx: mpsc::Receiver<T>,
) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}

/// Pulls `error.message` out of a provider error body, falling back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You write tweets.".to_string(),
            user: "rust async".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.55,
            max_output_tokens: 300,
            top_p: 1.0,
        }
    }

    fn client(server: &mockito::ServerGuard) -> LlmClient {
        LlmClient::new(
            "test-key".to_string(),
            format!("{}/chat/completions", server.url()),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_error_message_extracts_provider_message() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body.to_string()), "Invalid API Key");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway".to_string()), "Bad Gateway");
    }

    #[test]
    fn test_request_body_shape() {
        let req = request();
        let body = serde_json::to_value(ChatCompletionRequest::new(&req, true)).unwrap();
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You write tweets.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "rust async");
        assert_eq!(body["max_completion_tokens"], 300);
        assert_eq!(body["stream"], true);
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Ship small."}}],
                    "usage":{"prompt_tokens":12,"completion_tokens":3}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let text = client(&server).complete(&request()).await.unwrap();
        assert_eq!(text, "Ship small.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_does_not_retry_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid API Key"}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server).complete(&request()).await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream unavailable")
            .expect(3)
            .create_async()
            .await;

        let err = client(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_recovers_after_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let text = client(&server).complete(&request()).await.unwrap();
        assert_eq!(text, "ok");
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_empty_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Every \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"once in \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"a while\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"stream":true}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let stream = client(&server).stream(&request()).await.unwrap();
        let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Every ", "once in ", "a while"]);
    }

    #[tokio::test]
    async fn test_stream_surfaces_in_band_error() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"quota exceeded\"}}\n\n",
        );
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let items: Vec<Result<String, LlmError>> =
            client(&server).stream(&request()).await.unwrap().collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Hello");
        match &items[1] {
            Err(LlmError::Stream(message)) => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_cut_off_before_done_ends_with_error() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Half a \"}}]}\n\n";
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let items: Vec<Result<String, LlmError>> =
            client(&server).stream(&request()).await.unwrap().collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Half a ");
        match &items[1] {
            Err(LlmError::Stream(message)) => assert!(message.contains("[DONE]")),
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_done_without_trailing_newline_is_clean() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Short.\"}}]}\n\n",
            "data: [DONE]",
        );
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let items: Vec<Result<String, LlmError>> =
            client(&server).stream(&request()).await.unwrap().collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), "Short.");
    }

    #[tokio::test]
    async fn test_stream_open_failure_is_an_error_not_a_stream() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(403)
            .with_body(r#"{"error":{"message":"forbidden"}}"#)
            .create_async()
            .await;

        let result = client(&server).stream(&request()).await;
        assert!(matches!(result, Err(LlmError::Api { status: 403, .. })));
    }
}
