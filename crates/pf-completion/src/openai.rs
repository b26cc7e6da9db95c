// openai.rs — OpenAI-compatible chat-completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::CompletionError;
use crate::http::{self, PathSeg};
use crate::provider::{CompletionOptions, TextCompletionProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
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
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": options.max_output_tokens,
            "temperature": options.temperature,
        });
        if options.structured_output {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl TextCompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(prompt, options);
        let request = self.client.post(&url).bearer_auth(&self.api_key);
        let response = http::send_json(request, &body, &self.api_key).await?;

        http::text_at(
            &response,
            &[
                PathSeg::Key("choices"),
                PathSeg::Index(0),
                PathSeg::Key("message"),
                PathSeg::Key("content"),
            ],
        )
        .map(str::to_string)
        .ok_or_else(|| CompletionError::Server {
            status: 200,
            message: "response has no choices[0].message.content".to_string(),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_requests_ask_for_json_object() {
        let p = OpenAiProvider::new("k", "gpt-4o", None, Duration::from_secs(5));
        let plain = p.request_body("hi", &CompletionOptions::default());
        assert!(plain.get("response_format").is_none());

        let structured = p.request_body("hi", &CompletionOptions::default().structured());
        assert_eq!(structured["response_format"]["type"], "json_object");
        assert_eq!(structured["model"], "gpt-4o");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let p = OpenAiProvider::new(
            "k",
            "m",
            Some("http://localhost:8080/v1/".to_string()),
            Duration::from_secs(5),
        );
        assert_eq!(p.base_url, "http://localhost:8080/v1");
    }
}
