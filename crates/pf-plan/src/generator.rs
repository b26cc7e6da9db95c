// generator.rs — Produce the content of one file with a single completion call.
//
// The prompt carries the entry's description plus the full content of each
// declared dependency that has already been generated, in declaration order.
// Output is the raw response with one surrounding code fence removed.

use std::collections::HashMap;
use std::sync::Arc;

use pf_completion::TextCompletionProvider;

use crate::error::PlanError;
use crate::manifest::FileManifestEntry;
use crate::prompts;
use crate::settings::PlanSettings;

pub struct FileGenerator {
    provider: Arc<dyn TextCompletionProvider>,
    settings: PlanSettings,
}

impl FileGenerator {
    pub fn new(provider: Arc<dyn TextCompletionProvider>, settings: PlanSettings) -> Self {
        Self { provider, settings }
    }

    /// Generate the content for `entry`.
    ///
    /// Dependencies missing from `dependency_contents` are skipped; the
    /// orchestrator guarantees they are present when it calls this.
    pub async fn generate_file(
        &self,
        entry: &FileManifestEntry,
        dependency_contents: &HashMap<String, String>,
    ) -> Result<String, PlanError> {
        self.validate_description(&entry.path, &entry.description)?;

        let blocks: Vec<String> = entry
            .dependencies
            .iter()
            .filter_map(|dep| {
                dependency_contents
                    .get(dep)
                    .map(|content| prompts::dependency_block(dep, content))
            })
            .collect();
        let prompt = prompts::generate_prompt(entry, &blocks);

        tracing::debug!(
            path = %entry.path,
            dependencies = blocks.len(),
            prompt_chars = prompt.len(),
            "generating file"
        );
        self.complete_content(&entry.path, &prompt).await
    }

    /// Rewrite an existing file according to `instruction`.
    ///
    /// `related_contents` are shown to the model for reference, sorted by path.
    pub async fn modify_file(
        &self,
        path: &str,
        current_content: &str,
        instruction: &str,
        related_contents: &HashMap<String, String>,
    ) -> Result<String, PlanError> {
        self.validate_description(path, instruction)?;

        let mut related: Vec<(&String, &String)> = related_contents
            .iter()
            .filter(|(p, _)| p.as_str() != path)
            .collect();
        related.sort_by(|a, b| a.0.cmp(b.0));
        let blocks: Vec<String> = related
            .into_iter()
            .map(|(p, c)| prompts::dependency_block(p, c))
            .collect();
        let prompt = prompts::modify_prompt(path, current_content, instruction, &blocks);

        tracing::debug!(path, prompt_chars = prompt.len(), "modifying file");
        self.complete_content(path, &prompt).await
    }

    /// Reject descriptions and instructions too short to act on.
    pub fn validate_description(&self, path: &str, text: &str) -> Result<(), PlanError> {
        if text.trim().chars().count() < self.settings.min_description_len {
            return Err(PlanError::Validation(format!(
                "{path}: description must be at least {} characters",
                self.settings.min_description_len
            )));
        }
        Ok(())
    }

    async fn complete_content(&self, path: &str, prompt: &str) -> Result<String, PlanError> {
        let response = self
            .provider
            .complete(prompt, &self.settings.completion)
            .await?;
        let content = strip_code_fence(&response);
        if content.trim().is_empty() {
            return Err(PlanError::EmptyOutput {
                path: path.to_string(),
            });
        }
        Ok(content.to_string())
    }
}

/// Remove one Markdown code fence wrapping the whole of `text`.
///
/// The opening fence may carry a language tag. Text that is not entirely
/// fenced is returned unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };
    match inner.find('\n') {
        Some(newline) => {
            let body = &inner[newline + 1..];
            body.strip_suffix('\n')
                .map(|b| b.strip_suffix('\r').unwrap_or(b))
                .unwrap_or(body)
        }
        None => text,
    }
}
