//! Prompt Assembler — turns user inputs into a (system, user) prompt pair.
//!
//! The style template is used verbatim unless the user supplied a draft or
//! clarifying answers, which are appended under labeled sections so the model
//! treats them as material to refine.

use serde::Deserialize;

use crate::errors::AppError;
use crate::generation::presets::ContentKind;
use crate::generation::prompts::{
    CONTEXT_LABEL, DRAFT_LABEL, ENGAGEMENT_SYSTEM, LINKEDIN_SYSTEM, SCORE_TEXT_LABEL,
    TARGETED_QUESTIONS_TEMPLATE, TWEET_SYSTEM,
};

/// Warning returned when an action is triggered without a topic.
pub const TOPIC_REQUIRED: &str = "Topic is required.";

/// Warning returned when questions are requested without a topic.
pub const TOPIC_FIRST: &str = "Please enter a topic first.";

/// Inputs of one generation action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub draft: Option<String>,
    #[serde(default)]
    pub context_answers: Option<String>,
}

impl GenerationRequest {
    /// Rejects a blank topic before any external call is made.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.topic.trim().is_empty() {
            return Err(AppError::Validation(TOPIC_REQUIRED.to_string()));
        }
        Ok(())
    }

    pub fn draft(&self) -> Option<&str> {
        non_blank(self.draft.as_deref())
    }

    pub fn context_answers(&self) -> Option<&str> {
        non_blank(self.context_answers.as_deref())
    }
}

/// Template selector. `EngagementScore` never backs a generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    LinkedinPost,
    Tweet,
    EngagementScore,
}

impl PromptKind {
    pub fn template(self) -> &'static str {
        match self {
            PromptKind::LinkedinPost => LINKEDIN_SYSTEM,
            PromptKind::Tweet => TWEET_SYSTEM,
            PromptKind::EngagementScore => ENGAGEMENT_SYSTEM,
        }
    }
}

impl From<ContentKind> for PromptKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::LinkedinPost => PromptKind::LinkedinPost,
            ContentKind::Tweet => PromptKind::Tweet,
        }
    }
}

/// A system instruction plus the single user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Builds the prompt pair for a generation request.
pub fn assemble_generation(
    kind: ContentKind,
    request: &GenerationRequest,
) -> Result<PromptPair, AppError> {
    request.validate()?;
    Ok(assemble(
        kind.into(),
        request.topic.trim(),
        request.draft(),
        request.context_answers(),
    ))
}

/// Builds the prompt pair for any prompt kind.
///
/// For `EngagementScore`, `subject` is the text being rated and the optional
/// sections are ignored.
pub fn assemble(
    kind: PromptKind,
    subject: &str,
    draft: Option<&str>,
    context_answers: Option<&str>,
) -> PromptPair {
    if kind == PromptKind::EngagementScore {
        return PromptPair {
            system: kind.template().to_string(),
            user: format!("{SCORE_TEXT_LABEL}\n{subject}"),
        };
    }

    let mut system = kind.template().to_string();
    if let Some(draft) = non_blank(draft) {
        system.push_str(&format!("\n\n{DRAFT_LABEL}\n{}", draft.trim()));
    }
    if let Some(answers) = non_blank(context_answers) {
        system.push_str(&format!("\n\n{CONTEXT_LABEL}\n{}", answers.trim()));
    }

    PromptPair {
        system,
        user: subject.to_string(),
    }
}

/// Clarifying questions to ask before generating. No external call.
pub fn targeted_questions(topic: &str) -> String {
    let topic = topic.trim();
    if topic.is_empty() {
        return TOPIC_FIRST.to_string();
    }
    TARGETED_QUESTIONS_TEMPLATE.replace("{topic}", topic)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
