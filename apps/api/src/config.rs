use anyhow::{Context, Result};

/// Default Groq chat-completions endpoint (OpenAI-compatible).
pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Application configuration loaded from environment variables.
///
/// The API key is not required at startup: a missing key is only reported
/// once the first completion request is rejected by the provider.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_api_url: String,
    pub llm_timeout_secs: u64,
    pub llm_retry_delay_ms: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            groq_api_key: std::env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_api_url: std::env::var("GROQ_API_URL")
                .unwrap_or_else(|_| DEFAULT_GROQ_API_URL.to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            llm_retry_delay_ms: parse_env("LLM_RETRY_DELAY_MS", 1000)
                .context("LLM_RETRY_DELAY_MS must be a whole number of milliseconds")?,
            port: parse_env("PORT", 7860).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.groq_api_key.trim().is_empty()
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value for '{key}': {raw:?}")),
        Err(_) => Ok(default),
    }
}
