//! LLM access for the scan engine.
//!
//! Components talk to [`BaseAI`], which takes one prompt and returns the raw
//! completion text. Parsing and prompt wording live next to the components
//! that own them; only the shared helpers are here.

pub mod openai;
pub mod parse;
pub mod prompts;

pub use openai::OpenAI;

use async_trait::async_trait;

use crate::error::AiResult;

/// A single chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    /// Optional system message sent before the prompt.
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature: 0.0,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a prompt and return the raw text of the first choice.
    async fn complete(&self, request: &CompletionRequest) -> AiResult<String>;
}
