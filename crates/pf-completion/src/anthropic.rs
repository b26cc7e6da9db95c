// anthropic.rs — Anthropic messages API provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::CompletionError;
use crate::http;
use crate::provider::{CompletionOptions, TextCompletionProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: http::build_client(timeout),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub(crate) fn request_body(&self, prompt: &str, options: &CompletionOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": options.max_output_tokens,
            "temperature": options.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if options.structured_output {
            // No JSON mode on this API; pin the contract in the system prompt.
            body["system"] =
                json!("Respond with a single JSON object and nothing else.");
        }
        body
    }
}

/// Concatenate every text block of a messages response.
fn extract_text(response: &Value) -> Option<String> {
    let blocks = response.get("content")?.as_array()?;
    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    if blocks.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextCompletionProvider for AnthropicProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/messages", self.base_url);
        let body = self.request_body(prompt, options);
        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);
        let response = http::send_json(request, &body, &self.api_key).await?;

        extract_text(&response).ok_or_else(|| CompletionError::Server {
            status: 200,
            message: "response has no content blocks".to_string(),
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
