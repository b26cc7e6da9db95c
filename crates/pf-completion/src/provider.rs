// provider.rs — The text-completion seam.
//
// The pipeline treats the language model as a black box: prompt text in,
// completion text out. Concrete providers (OpenAI, Anthropic, Ollama, a
// scripted stub) implement this trait and are chosen by configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

/// Per-request generation options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionOptions {
    /// Ask the provider for machine-parseable JSON output.
    #[serde(default)]
    pub structured_output: bool,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            structured_output: false,
            max_output_tokens: 4096,
            temperature: 0.2,
        }
    }
}

impl CompletionOptions {
    pub fn structured(mut self) -> Self {
        self.structured_output = true;
        self
    }
}

/// A text-completion backend.
#[async_trait]
pub trait TextCompletionProvider: Send + Sync {
    /// Complete `prompt` and return the raw response text.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError>;

    /// Provider display name (for logs).
    fn name(&self) -> &str;
}
