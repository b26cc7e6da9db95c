// settings.rs — Tunables shared by the plan builder and file generator.

use pf_completion::CompletionOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanSettings {
    /// Minimum trimmed length of a generation prompt.
    pub min_prompt_len: usize,
    /// Minimum trimmed length of a manifest entry description.
    pub min_description_len: usize,
    /// Token and temperature settings passed to every completion request.
    pub completion: CompletionOptions,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            min_prompt_len: 10,
            min_description_len: 3,
            completion: CompletionOptions::default(),
        }
    }
}
