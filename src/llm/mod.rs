//! LLM client abstraction.
//!
//! The planning engine and the `llm_tool` only need single-turn completions,
//! so the trait is deliberately narrow.

mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM response contained no text")]
    EmptyResponse,
}

/// A single-turn completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Overrides the client's default model when set
    pub model: Option<String>,
    pub system: Option<String>,
    pub prompt: String,
    /// Ask the provider for a JSON document instead of free text
    pub json: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Return the text of the first candidate.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
