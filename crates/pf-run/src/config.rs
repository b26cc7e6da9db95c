// config.rs — Project layout and forge.toml settings.
//
// `ForgeConfig::for_project()` lays everything out under a `.forge/`
// directory in the project root. `ForgeSettings` is read from
// `.forge/forge.toml`; a missing file means defaults throughout.

use std::fs;
use std::path::{Path, PathBuf};

use pf_completion::ProviderConfig;
use pf_plan::PlanSettings;
use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::retry::RetryPolicy;

/// Where a project's state lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Root directory of the workspace.
    pub root: PathBuf,

    /// JSONL change records, one file per project.
    pub changes_dir: PathBuf,

    /// GenerationRun records, one JSON file per run.
    pub runs_dir: PathBuf,

    /// Accepted project files, one subdirectory per project.
    pub projects_dir: PathBuf,

    /// Credit balances.
    pub credits_file: PathBuf,

    /// Run transition log.
    pub log_file: PathBuf,

    /// Settings file (forge.toml).
    pub settings_file: PathBuf,
}

impl ForgeConfig {
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let forge_dir = root.join(".forge");
        Self {
            root,
            changes_dir: forge_dir.join("changes"),
            runs_dir: forge_dir.join("runs"),
            projects_dir: forge_dir.join("projects"),
            credits_file: forge_dir.join("credits.json"),
            log_file: forge_dir.join("runs.log.jsonl"),
            settings_file: forge_dir.join("forge.toml"),
        }
    }

    /// Load forge.toml, or defaults if it does not exist.
    pub fn load_settings(&self) -> Result<ForgeSettings, RunError> {
        ForgeSettings::load_or_default(&self.settings_file)
    }
}

/// Top-level settings from forge.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeSettings {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub retry: RetryPolicy,
}

/// `[generation]` section of forge.toml.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Minimum trimmed prompt length accepted for a generation.
    #[serde(default = "default_min_prompt_len")]
    pub min_prompt_len: usize,

    /// Minimum trimmed length of a file description or modify instruction.
    #[serde(default = "default_min_description_len")]
    pub min_description_len: usize,

    /// Credits charged per accepted prompt.
    #[serde(default = "default_credit_cost")]
    pub credit_cost: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            min_prompt_len: default_min_prompt_len(),
            min_description_len: default_min_description_len(),
            credit_cost: default_credit_cost(),
        }
    }
}

// Serde default functions
fn default_min_prompt_len() -> usize {
    10
}

fn default_min_description_len() -> usize {
    3
}

fn default_credit_cost() -> u64 {
    1
}

impl ForgeSettings {
    /// Parse settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RunError> {
        let content = fs::read_to_string(path).map_err(|source| RunError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Load settings, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, RunError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no forge.toml, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, RunError> {
        toml::from_str(content).map_err(|e| RunError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Settings handed to the plan builder and file generator.
    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            min_prompt_len: self.generation.min_prompt_len,
            min_description_len: self.generation.min_description_len,
            completion: self.provider.completion_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_completion::ProviderKind;
    use tempfile::tempdir;

    #[test]
    fn layout_lives_under_dot_forge() {
        let config = ForgeConfig::for_project("/work/app");
        assert_eq!(config.runs_dir, PathBuf::from("/work/app/.forge/runs"));
        assert_eq!(
            config.settings_file,
            PathBuf::from("/work/app/.forge/forge.toml")
        );
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = ForgeConfig::for_project(dir.path()).load_settings().unwrap();
        assert_eq!(settings.generation, GenerationSettings::default());
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(settings.provider.kind, ProviderKind::Openai);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        fs::write(
            &path,
            r#"
[provider]
kind = "ollama"
model = "llama3"
temperature = 0.5

[generation]
credit_cost = 3

[retry]
max_attempts = 5
"#,
        )
        .unwrap();

        let settings = ForgeSettings::load(&path).unwrap();
        assert_eq!(settings.provider.kind, ProviderKind::Ollama);
        assert_eq!(settings.generation.credit_cost, 3);
        assert_eq!(settings.generation.min_prompt_len, 10);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.base_delay_ms, 500);

        let plan = settings.plan_settings();
        assert_eq!(plan.completion.temperature, 0.5);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        fs::write(&path, "[provider\nkind = ").unwrap();
        assert!(matches!(
            ForgeSettings::load(&path),
            Err(RunError::Config { .. })
        ));
    }
}
