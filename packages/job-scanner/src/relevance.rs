//! Relevance classification of newly discovered postings.

use async_trait::async_trait;
use std::sync::Arc;

use crate::ai::prompts::{relevance_input, DEFAULT_RELEVANCE_PROMPT};
use crate::ai::{BaseAI, CompletionRequest};
use crate::error::AiResult;
use crate::types::Posting;

/// Annotates a posting with a short verdict.
#[async_trait]
pub trait RelevanceClassifier: Send + Sync {
    async fn classify(&self, posting: &Posting) -> AiResult<String>;
}

pub struct LlmRelevanceClassifier {
    ai: Arc<dyn BaseAI>,
    model: String,
    prompt: String,
}

impl LlmRelevanceClassifier {
    pub fn new(ai: Arc<dyn BaseAI>, model: impl Into<String>) -> Self {
        Self {
            ai,
            model: model.into(),
            prompt: DEFAULT_RELEVANCE_PROMPT.to_string(),
        }
    }

    /// Replace the instruction sent as the system message.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl RelevanceClassifier for LlmRelevanceClassifier {
    async fn classify(&self, posting: &Posting) -> AiResult<String> {
        let input = relevance_input(
            &posting.title,
            &posting.company,
            posting.detail.as_deref().unwrap_or_default(),
        );
        let request = CompletionRequest::new(&self.model, input)
            .with_system(&self.prompt)
            .with_temperature(0.3);

        self.ai.complete(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAI;

    #[tokio::test]
    async fn sends_prompt_as_system_message() {
        let ai = Arc::new(MockAI::new().with_default_response("Backend role, technical."));
        let classifier = LlmRelevanceClassifier::new(ai.clone(), "gpt-4o");

        let verdict = classifier
            .classify(&Posting::new("Backend Engineer", "https://a.com/1").with_detail("Rust"))
            .await
            .unwrap();

        assert_eq!(verdict, "Backend role, technical.");
        let call = &ai.calls()[0];
        assert_eq!(call.system.as_deref(), Some(DEFAULT_RELEVANCE_PROMPT));
        assert_eq!(
            call.prompt,
            "Job Title: Backend Engineer\nCompany: Not specified\nJob Description: Rust"
        );
    }

    #[tokio::test]
    async fn custom_prompt_replaces_default() {
        let ai = Arc::new(MockAI::new().with_default_response("No match"));
        let classifier =
            LlmRelevanceClassifier::new(ai.clone(), "gpt-4o").with_prompt("Is this sales?");

        classifier
            .classify(&Posting::new("AE", "https://a.com/2").with_company("Acme"))
            .await
            .unwrap();

        assert_eq!(ai.calls()[0].system.as_deref(), Some("Is this sales?"));
    }
}
