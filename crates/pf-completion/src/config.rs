// config.rs — Provider selection by explicit configuration.
//
// The provider is picked from `kind`, never inferred from the model name.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::anthropic::AnthropicProvider;
use crate::error::CompletionError;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{CompletionOptions, TextCompletionProvider};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Openai,
    Anthropic,
    Ollama,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Openai => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// `[provider]` section of forge.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_kind")]
    pub kind: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Override the provider's API root (proxies, self-hosted gateways).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key. Defaults per `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            model: default_model(),
            base_url: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
        }
    }
}

// Serde default functions
fn default_kind() -> ProviderKind {
    ProviderKind::Openai
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_output_tokens() -> u32 {
    CompletionOptions::default().max_output_tokens
}

fn default_temperature() -> f32 {
    CompletionOptions::default().temperature
}

impl ProviderKind {
    /// Conventional API key variable for hosted providers.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Ollama => "OLLAMA_API_KEY",
        }
    }
}

impl ProviderConfig {
    /// The configured key variable, or the conventional one for `kind`.
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Request options every call to this provider starts from.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            structured_output: false,
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }

    /// Build the configured provider. Hosted providers need their API key
    /// present in the environment.
    pub fn build(&self) -> Result<Arc<dyn TextCompletionProvider>, CompletionError> {
        let provider: Arc<dyn TextCompletionProvider> = match self.kind {
            ProviderKind::Openai => Arc::new(OpenAiProvider::new(
                self.api_key()?,
                &self.model,
                self.base_url.clone(),
                self.timeout(),
            )),
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
                self.api_key()?,
                &self.model,
                self.base_url.clone(),
                self.timeout(),
            )),
            ProviderKind::Ollama => Arc::new(OllamaProvider::new(
                &self.model,
                self.base_url.clone(),
                self.timeout(),
            )),
        };
        tracing::debug!(provider = %self.kind, model = %self.model, "completion provider ready");
        Ok(provider)
    }

    fn api_key(&self) -> Result<String, CompletionError> {
        let var = self.api_key_env();
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(CompletionError::Auth(format!(
                "environment variable {} is not set",
                var
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_from_empty_table() {
        let config: ProviderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.kind, ProviderKind::Openai);
        assert_eq!(config.timeout_secs, 120);
        assert!(config.base_url.is_none());
        assert_eq!(config.completion_options(), CompletionOptions::default());
    }

    #[test]
    fn missing_api_key_is_auth_error() {
        let config = ProviderConfig {
            api_key_env: Some("PF_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..ProviderConfig::default()
        };
        assert!(matches!(config.build(), Err(CompletionError::Auth(_))));
    }

    #[test]
    fn ollama_builds_without_api_key() {
        let config = ProviderConfig {
            kind: ProviderKind::Ollama,
            model: "llama3".to_string(),
            ..ProviderConfig::default()
        };
        assert_eq!(config.build().unwrap().name(), "ollama");
    }

    #[test]
    fn key_variable_follows_kind_unless_set() {
        let anthropic: ProviderConfig = serde_json::from_str(r#"{"kind": "anthropic"}"#).unwrap();
        assert_eq!(anthropic.api_key_env(), "ANTHROPIC_API_KEY");
        assert_eq!(ProviderConfig::default().api_key_env(), "OPENAI_API_KEY");

        let custom: ProviderConfig =
            serde_json::from_str(r#"{"kind": "anthropic", "api_key_env": "MY_KEY"}"#).unwrap();
        assert_eq!(custom.api_key_env(), "MY_KEY");
    }

    #[test]
    fn kind_parses_snake_case() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"kind": "anthropic", "model": "claude"}"#).unwrap();
        assert_eq!(config.kind, ProviderKind::Anthropic);
    }
}
