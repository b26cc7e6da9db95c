// builder.rs — Turn a natural-language prompt into a file manifest.
//
// Exactly one structured completion request per call. The response goes
// through one parse step: strip a single surrounding code fence if present,
// then deserialize. Anything that does not yield a named project with at
// least one file is a MalformedPlan. Retries are the caller's business.

use std::sync::Arc;

use pf_completion::TextCompletionProvider;
use serde::Deserialize;

use crate::error::PlanError;
use crate::generator::strip_code_fence;
use crate::manifest::{FileManifest, FileManifestEntry};
use crate::prompts;
use crate::settings::PlanSettings;

/// Wire shape of the plan response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    project_name: Option<String>,
    files: Option<Vec<PlanResponseFile>>,
}

#[derive(Deserialize)]
struct PlanResponseFile {
    path: String,
    description: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

pub struct PlanBuilder {
    provider: Arc<dyn TextCompletionProvider>,
    settings: PlanSettings,
}

impl PlanBuilder {
    pub fn new(provider: Arc<dyn TextCompletionProvider>, settings: PlanSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &PlanSettings {
        &self.settings
    }

    /// Reject prompts too short to plan from. Makes no request.
    pub fn validate_prompt(&self, prompt: &str) -> Result<(), PlanError> {
        if prompt.trim().chars().count() < self.settings.min_prompt_len {
            return Err(PlanError::Validation(format!(
                "prompt must be at least {} characters",
                self.settings.min_prompt_len
            )));
        }
        Ok(())
    }

    /// Ask the model for a manifest describing `prompt`.
    pub async fn build_plan(&self, prompt: &str) -> Result<FileManifest, PlanError> {
        self.validate_prompt(prompt)?;
        let trimmed = prompt.trim();

        let request = prompts::plan_prompt(trimmed);
        let options = self.settings.completion.clone().structured();
        tracing::debug!(
            provider = self.provider.name(),
            prompt_chars = request.len(),
            "requesting plan"
        );
        let response = self.provider.complete(&request, &options).await?;
        let manifest = parse_manifest(&response)?;
        tracing::info!(
            project = %manifest.project_name,
            files = manifest.files.len(),
            "plan received"
        );
        Ok(manifest)
    }
}

/// Parse a plan response into a manifest.
pub fn parse_manifest(response: &str) -> Result<FileManifest, PlanError> {
    let body = strip_code_fence(response);
    let parsed: PlanResponse =
        serde_json::from_str(body).map_err(|e| PlanError::MalformedPlan(e.to_string()))?;

    let project_name = parsed
        .project_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PlanError::MalformedPlan("missing projectName".to_string()))?;

    let files = parsed.files.unwrap_or_default();
    if files.is_empty() {
        return Err(PlanError::MalformedPlan("plan lists no files".to_string()));
    }

    let files = files
        .into_iter()
        .map(|f| {
            if f.path.trim().is_empty() {
                return Err(PlanError::MalformedPlan("file with empty path".to_string()));
            }
            if f.description.trim().is_empty() {
                return Err(PlanError::MalformedPlan(format!(
                    "{} has no description",
                    f.path
                )));
            }
            Ok(FileManifestEntry {
                path: f.path,
                description: f.description,
                dependencies: f.dependencies,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FileManifest {
        project_name,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_completion::{CompletionError, ScriptedProvider};

    const TWO_FILES: &str = r#"{
        "projectName": "demo",
        "files": [
            {"path": "a.ts", "description": "exports A", "dependencies": []},
            {"path": "b.ts", "description": "uses A", "dependencies": ["a.ts"]}
        ]
    }"#;

    fn builder(provider: Arc<ScriptedProvider>) -> PlanBuilder {
        PlanBuilder::new(provider, PlanSettings::default())
    }

    #[tokio::test]
    async fn builds_manifest_with_one_structured_request() {
        let provider = Arc::new(ScriptedProvider::new().with_response(TWO_FILES));
        let manifest = builder(provider.clone())
            .build_plan("a two file TypeScript demo")
            .await
            .unwrap();

        assert_eq!(manifest.project_name, "demo");
        assert_eq!(manifest.paths(), vec!["a.ts", "b.ts"]);
        assert_eq!(manifest.files[1].dependencies, vec!["a.ts"]);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].options.structured_output);
        assert!(requests[0].prompt.contains("a two file TypeScript demo"));
    }

    #[tokio::test]
    async fn short_prompt_is_rejected_before_any_request() {
        let provider = Arc::new(ScriptedProvider::new().with_response(TWO_FILES));
        let err = builder(provider.clone())
            .build_plan("   too short   ")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
        assert_eq!(provider.request_count(), 0);
    }

    #[tokio::test]
    async fn completion_errors_pass_through_without_retry() {
        let provider = Arc::new(ScriptedProvider::new().with_error(CompletionError::RateLimit {
            message: "slow down".into(),
            retry_after: None,
        }));
        let err = builder(provider.clone())
            .build_plan("a two file TypeScript demo")
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Completion(CompletionError::RateLimit { .. })));
        assert!(err.is_retryable());
        assert_eq!(provider.request_count(), 1);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let fenced = format!("```json\n{TWO_FILES}\n```");
        assert_eq!(parse_manifest(&fenced).unwrap().files.len(), 2);
    }

    #[test]
    fn prose_around_json_is_malformed() {
        let chatty = format!("Here is your plan:\n{TWO_FILES}");
        assert!(matches!(
            parse_manifest(&chatty),
            Err(PlanError::MalformedPlan(_))
        ));
    }

    #[test]
    fn missing_project_name_is_malformed() {
        let err = parse_manifest(r#"{"files": [{"path": "a", "description": "x"}]}"#).unwrap_err();
        assert!(matches!(err, PlanError::MalformedPlan(m) if m.contains("projectName")));
    }

    #[test]
    fn empty_file_list_is_malformed() {
        assert!(matches!(
            parse_manifest(r#"{"projectName": "demo", "files": []}"#),
            Err(PlanError::MalformedPlan(_))
        ));
        assert!(matches!(
            parse_manifest(r#"{"projectName": "demo"}"#),
            Err(PlanError::MalformedPlan(_))
        ));
    }

    #[test]
    fn blank_description_is_malformed() {
        let err = parse_manifest(
            r#"{"projectName": "demo", "files": [{"path": "a", "description": "  "}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::MalformedPlan(_)));
    }
}
