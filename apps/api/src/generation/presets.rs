//! Content kinds and their sampling presets.
//!
//! One generation stage serves every kind; only the template and the preset
//! differ. Presets are fixed at compile time so the model choice never drifts
//! between the streaming and non-streaming paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const LINKEDIN_MODEL: &str = "openai/gpt-oss-20b";
pub const FAST_MODEL: &str = "llama-3.1-8b-instant";

/// Which piece of content a flow produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    LinkedinPost,
    Tweet,
}

/// Sampling parameters sent with a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub model: &'static str,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

/// Longer-form, warmer output.
pub const LINKEDIN_PRESET: GenerationParams = GenerationParams {
    model: LINKEDIN_MODEL,
    temperature: 0.7,
    max_output_tokens: 800,
    top_p: 1.0,
};

/// Short, cooler output.
pub const TWEET_PRESET: GenerationParams = GenerationParams {
    model: FAST_MODEL,
    temperature: 0.55,
    max_output_tokens: 300,
    top_p: 1.0,
};

/// Engagement rating: near-deterministic, one line.
pub const SCORING_PRESET: GenerationParams = GenerationParams {
    model: FAST_MODEL,
    temperature: 0.4,
    max_output_tokens: 50,
    top_p: 1.0,
};

impl ContentKind {
    pub fn preset(self) -> GenerationParams {
        match self {
            ContentKind::LinkedinPost => LINKEDIN_PRESET,
            ContentKind::Tweet => TWEET_PRESET,
        }
    }

    /// Human-readable name used in error strings.
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::LinkedinPost => "LinkedIn post",
            ContentKind::Tweet => "tweet",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::LinkedinPost => "linkedin_post",
            ContentKind::Tweet => "tweet",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" | "linkedin_post" | "linkedin-post" => Ok(ContentKind::LinkedinPost),
            "tweet" | "twitter" => Ok(ContentKind::Tweet),
            other => Err(AppError::NotFound(format!("Unknown content kind '{other}'"))),
        }
    }
}
