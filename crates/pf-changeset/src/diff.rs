// diff.rs — Line-level diff between two text blobs.
//
// The policy is positional: both inputs are walked with two cursors and
// mismatched lines are emitted as a remove/add pair at the same position.
// No search for the line elsewhere in the other sequence is performed, so an
// insertion near the top of a file reports every following line as changed.
// Reviewers and tests rely on this exact output, so do not "improve" it into
// a minimal edit script without versioning the format.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// How a single line participates in a diff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffLineKind {
    /// Present only in the modified text.
    Add,
    /// Present only in the original text.
    Remove,
    /// Unchanged at this position.
    Normal,
}

/// One line of diff output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: DiffLineKind,
    pub content: String,
    /// 1-based line number: new-side for `Add`, old-side otherwise.
    pub line_number: usize,
}

/// A contiguous hunk. The engine always emits exactly one covering both files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffChunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<DiffLine>,
}

/// The derived difference between an original and modified text.
///
/// Never persisted: recompute it from the change's content pair whenever it
/// is needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDiff {
    pub additions: usize,
    pub deletions: usize,
    pub chunks: Vec<DiffChunk>,
}

impl FileDiff {
    /// True when the two inputs were line-for-line identical.
    pub fn is_unchanged(&self) -> bool {
        self.additions == 0 && self.deletions == 0
    }

    /// Number of lines that are not `Normal`.
    pub fn changed_lines(&self) -> usize {
        self.chunks
            .iter()
            .flat_map(|c| c.lines.iter())
            .filter(|l| l.kind != DiffLineKind::Normal)
            .count()
    }

    /// Render as unified diff text for terminal display.
    pub fn to_unified(&self, path: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- a/{}", path);
        let _ = writeln!(out, "+++ b/{}", path);
        for chunk in &self.chunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                chunk.old_start, chunk.old_lines, chunk.new_start, chunk.new_lines
            );
            for line in &chunk.lines {
                let prefix = match line.kind {
                    DiffLineKind::Add => '+',
                    DiffLineKind::Remove => '-',
                    DiffLineKind::Normal => ' ',
                };
                let _ = writeln!(out, "{}{}", prefix, line.content);
            }
        }
        out
    }
}

/// Split text into lines on `\n`.
///
/// A trailing newline terminates the last line rather than starting a new
/// empty one, and the empty string has no lines at all.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Compute the positional line diff of `original` → `modified`.
pub fn diff(original: &str, modified: &str) -> FileDiff {
    let old = split_lines(original);
    let new = split_lines(modified);

    let mut lines = Vec::with_capacity(old.len().max(new.len()));
    let mut additions = 0;
    let mut deletions = 0;
    let (mut i, mut j) = (0, 0);

    while i < old.len() || j < new.len() {
        if i >= old.len() {
            lines.push(DiffLine {
                kind: DiffLineKind::Add,
                content: new[j].to_string(),
                line_number: j + 1,
            });
            additions += 1;
            j += 1;
        } else if j >= new.len() {
            lines.push(DiffLine {
                kind: DiffLineKind::Remove,
                content: old[i].to_string(),
                line_number: i + 1,
            });
            deletions += 1;
            i += 1;
        } else if old[i] == new[j] {
            lines.push(DiffLine {
                kind: DiffLineKind::Normal,
                content: old[i].to_string(),
                line_number: i + 1,
            });
            i += 1;
            j += 1;
        } else {
            lines.push(DiffLine {
                kind: DiffLineKind::Remove,
                content: old[i].to_string(),
                line_number: i + 1,
            });
            lines.push(DiffLine {
                kind: DiffLineKind::Add,
                content: new[j].to_string(),
                line_number: j + 1,
            });
            deletions += 1;
            additions += 1;
            i += 1;
            j += 1;
        }
    }

    let chunk = DiffChunk {
        old_start: usize::from(!old.is_empty()),
        old_lines: old.len(),
        new_start: usize::from(!new.is_empty()),
        new_lines: new.len(),
        lines,
    };

    FileDiff {
        additions,
        deletions,
        chunks: vec![chunk],
    }
}
