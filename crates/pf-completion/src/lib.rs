//! # pf-completion
//!
//! Text-completion providers for PromptForge.
//!
//! The pipeline only needs "prompt in, text out". [`TextCompletionProvider`]
//! is that seam; [`ProviderConfig`] picks an implementation by explicit
//! configuration. Every provider makes a single attempt per call and reports
//! failures through [`CompletionError`], leaving retry policy to the caller.

pub mod anthropic;
pub mod config;
pub mod error;
mod http;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod scripted;

pub use anthropic::AnthropicProvider;
pub use config::{ProviderConfig, ProviderKind};
pub use error::CompletionError;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{CompletionOptions, TextCompletionProvider};
pub use scripted::{RecordedRequest, ScriptedProvider};
