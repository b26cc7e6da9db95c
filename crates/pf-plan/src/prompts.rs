// prompts.rs — Prompt templates for planning, generation, and modification.
//
// Kept as plain functions so builders stay free of string plumbing and tests
// can assert on exactly what the model sees.

use crate::manifest::FileManifestEntry;

/// Planning prompt. The response must be a single JSON object.
pub fn plan_prompt(user_prompt: &str) -> String {
    format!(
        "You are a software architect. Plan the files for the project described below.\n\
         \n\
         Respond with a single JSON object and nothing else, shaped as:\n\
         {{\"projectName\": string, \"files\": [{{\"path\": string, \"description\": string, \"dependencies\": [string]}}]}}\n\
         \n\
         Rules:\n\
         - paths are relative and unique\n\
         - dependencies list only paths that appear in \"files\"\n\
         - no file may depend on itself, directly or indirectly\n\
         \n\
         Project description:\n\
         {user_prompt}\n"
    )
}

/// Labelled block holding the full content of one dependency.
pub fn dependency_block(path: &str, content: &str) -> String {
    format!("--- BEGIN {path} ---\n{content}\n--- END {path} ---\n")
}

/// Generation prompt for one manifest entry. `blocks` are already-rendered
/// dependency blocks in declaration order.
pub fn generate_prompt(entry: &FileManifestEntry, blocks: &[String]) -> String {
    let mut prompt = format!(
        "Write the complete contents of the file `{}`.\n\
         \n\
         Purpose: {}\n",
        entry.path, entry.description
    );
    if !blocks.is_empty() {
        prompt.push_str("\nThis file depends on the following files, shown in full:\n\n");
        for block in blocks {
            prompt.push_str(block);
            prompt.push('\n');
        }
    }
    prompt.push_str(RAW_OUTPUT_RULE);
    prompt
}

/// Modification prompt: rewrite `path` according to `instruction`.
pub fn modify_prompt(path: &str, current: &str, instruction: &str, blocks: &[String]) -> String {
    let mut prompt = format!(
        "Rewrite the file `{path}` to satisfy this request:\n{instruction}\n\n\
         Current contents:\n{}",
        dependency_block(path, current)
    );
    if !blocks.is_empty() {
        prompt.push_str("\nRelated files, for reference only:\n\n");
        for block in blocks {
            prompt.push_str(block);
            prompt.push('\n');
        }
    }
    prompt.push_str(RAW_OUTPUT_RULE);
    prompt
}

const RAW_OUTPUT_RULE: &str = "\nRespond with the raw file content only. \
No explanations, no Markdown, no code fences.\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_prompt_includes_blocks_in_order() {
        let entry = FileManifestEntry::new("c.ts", "glue");
        let blocks = vec![
            dependency_block("a.ts", "export const A = 1;"),
            dependency_block("b.ts", "export const B = 2;"),
        ];
        let prompt = generate_prompt(&entry, &blocks);
        let a = prompt.find("--- BEGIN a.ts ---").unwrap();
        let b = prompt.find("--- BEGIN b.ts ---").unwrap();
        assert!(a < b);
        assert!(prompt.contains("export const A = 1;"));
        assert!(prompt.contains("raw file content only"));
    }

    #[test]
    fn generate_prompt_without_dependencies_has_no_dependency_section() {
        let prompt = generate_prompt(&FileManifestEntry::new("a.ts", "entry point"), &[]);
        assert!(!prompt.contains("depends on"));
        assert!(prompt.contains("entry point"));
    }

    #[test]
    fn plan_prompt_embeds_user_text() {
        assert!(plan_prompt("a todo app in TypeScript").contains("a todo app in TypeScript"));
    }
}
