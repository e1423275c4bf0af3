//! Task-category prompt optimization.
//!
//! Each task category selects a fixed instructional prefix that is
//! prepended to the caller's prompt before it reaches the codex CLI.
//! The category has no effect on command-line construction.

use serde::Deserialize;

/// Classification of the requested coding task.
///
/// Used only to pick a prompt prefix. Unrecognized category strings
/// deserialize to [`TaskKind::Other`], which selects no prefix, so an
/// unknown category never fails a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum TaskKind {
    /// General coding assistance (no prefix).
    #[default]
    General,
    /// Generate new code.
    CodeGeneration,
    /// Explain existing code.
    CodeExplanation,
    /// Find and fix bugs.
    Debugging,
    /// Improve code structure.
    Refactoring,
    /// Write or fix tests.
    Testing,
    /// Security analysis and fixes.
    Security,
    /// Generate or improve documentation.
    Documentation,
    /// Catch-all for unrecognized categories (no prefix).
    Other,
}

impl From<String> for TaskKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "general" => Self::General,
            "code-generation" => Self::CodeGeneration,
            "code-explanation" => Self::CodeExplanation,
            "debugging" => Self::Debugging,
            "refactoring" => Self::Refactoring,
            "testing" => Self::Testing,
            "security" => Self::Security,
            "documentation" => Self::Documentation,
            _ => Self::Other,
        }
    }
}

impl TaskKind {
    /// The fixed instructional prefix for this category.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::General | Self::Other => "",
            Self::CodeGeneration => {
                "Generate clean, well-documented code for the following task:\n\n"
            }
            Self::CodeExplanation => {
                "Provide a detailed explanation of the following code, including what it does, \
                 how it works, and any notable patterns:\n\n"
            }
            Self::Debugging => {
                "Analyze the following code/issue for bugs, explain the problems found, and \
                 provide fixes:\n\n"
            }
            Self::Refactoring => {
                "Refactor the following code to improve readability, performance, and \
                 maintainability:\n\n"
            }
            Self::Testing => {
                "Write comprehensive tests for the following code or fix existing test issues:\n\n"
            }
            Self::Security => {
                "Perform a security analysis of the following code, identify vulnerabilities, \
                 and suggest fixes:\n\n"
            }
            Self::Documentation => {
                "Generate or improve documentation for the following code:\n\n"
            }
        }
    }
}

/// Prepend the category's instructional prefix to `prompt`.
///
/// Pure: the original prompt text is never altered, only prefixed
/// (with the empty string for `general` and unrecognized categories).
pub fn optimize_prompt(prompt: &str, task: TaskKind) -> String {
    let prefix = task.prefix();
    if prefix.is_empty() {
        prompt.to_owned()
    } else {
        format!("{prefix}{prompt}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: &[TaskKind] = &[
        TaskKind::General,
        TaskKind::CodeGeneration,
        TaskKind::CodeExplanation,
        TaskKind::Debugging,
        TaskKind::Refactoring,
        TaskKind::Testing,
        TaskKind::Security,
        TaskKind::Documentation,
        TaskKind::Other,
    ];

    #[test]
    fn test_prefix_only_prepends() {
        // The original prompt must survive verbatim as a suffix for every category.
        let prompt = "fix the race in src/watcher.rs";
        for &kind in ALL_KINDS {
            let optimized = optimize_prompt(prompt, kind);
            assert!(
                optimized.ends_with(prompt),
                "{kind:?} mutated the prompt: {optimized}"
            );
            assert_eq!(optimized, format!("{}{prompt}", kind.prefix()));
        }
    }

    #[test]
    fn test_general_and_other_have_no_prefix() {
        assert_eq!(optimize_prompt("hello", TaskKind::General), "hello");
        assert_eq!(optimize_prompt("hello", TaskKind::Other), "hello");
    }

    #[test]
    fn test_debugging_prefix() {
        let optimized = optimize_prompt("why does this panic?", TaskKind::Debugging);
        assert!(optimized.starts_with("Analyze the following code/issue for bugs"));
        assert!(optimized.ends_with("why does this panic?"));
    }

    #[test]
    fn test_deserialize_kebab_case_names() {
        let kind: TaskKind =
            serde_json::from_str("\"code-generation\"").expect("should deserialize");
        assert_eq!(kind, TaskKind::CodeGeneration);

        let kind: TaskKind = serde_json::from_str("\"security\"").expect("should deserialize");
        assert_eq!(kind, TaskKind::Security);
    }

    #[test]
    fn test_unrecognized_category_maps_to_other() {
        let kind: TaskKind =
            serde_json::from_str("\"poetry-review\"").expect("should deserialize");
        assert_eq!(kind, TaskKind::Other);
        assert_eq!(kind.prefix(), "");
    }
}
