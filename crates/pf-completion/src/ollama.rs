// ollama.rs — Local Ollama provider (`/api/generate`, non-streaming).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::CompletionError;
use crate::http::{self, PathSeg};
use crate::provider::{CompletionOptions, TextCompletionProvider};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(model: impl Into<String>, base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: http::build_client(timeout),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
        }
    }

    pub(crate) fn request_body(&self, prompt: &str, options: &CompletionOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_output_tokens,
            },
        });
        if options.structured_output {
            body["format"] = json!("json");
        }
        body
    }
}

#[async_trait]
impl TextCompletionProvider for OllamaProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.request_body(prompt, options);
        let response = http::send_json(self.client.post(&url), &body, "").await?;

        http::text_at(&response, &[PathSeg::Key("response")])
            .map(str::to_string)
            .ok_or_else(|| CompletionError::Server {
                status: 200,
                message: "response has no 'response' field".to_string(),
            })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
