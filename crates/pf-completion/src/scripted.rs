// scripted.rs — A provider that replays canned responses.
//
// Used by tests across the workspace. Every prompt it receives is recorded
// for later inspection.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::provider::{CompletionOptions, TextCompletionProvider};

/// A prompt the scripted provider was asked to complete.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub prompt: String,
    pub options: CompletionOptions,
}

#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response (builder pattern).
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue an error response (builder pattern).
    pub fn with_error(self, error: CompletionError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: Result<String, CompletionError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TextCompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                prompt: prompt.to_string(),
                options: options.clone(),
            });
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        next.unwrap_or_else(|| {
            Err(CompletionError::Server {
                status: 500,
                message: "scripted provider has no responses left".to_string(),
            })
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
