//! codex_agent tool — delegate a coding task to the codex CLI.
//!
//! Arguments deserialize straight into a [`CodexRequest`]; the translator
//! does the rest. The structured outcome is returned as one pretty-printed
//! JSON text block, with `isError` set when the run failed.

use anyhow::{Context, Result};

use crate::codex::{self, CodexRequest};
use crate::server::{ServerConfig, ToolCallResult, ToolDefinition};

use super::json_result;

/// Returns the JSON Schema tool definition for `codex_agent`.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "codex_agent".to_owned(),
        description: "Interact with OpenAI's Codex CLI, a lightweight coding agent that runs \
                      in your terminal. Handles code generation, explanation, debugging, \
                      refactoring and more; runs non-interactively and returns the captured \
                      output when the task completes."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The task or question to send to Codex"
                },
                "model": {
                    "type": "string",
                    "description": "AI model to use (o4-mini, o4-preview, gpt-4.1, ...)",
                    "default": "o4-mini"
                },
                "approval_mode": {
                    "type": "string",
                    "enum": ["suggest", "auto-edit", "full-auto"],
                    "description": "Agent autonomy level: suggest requires approval for all actions, auto-edit writes files automatically, full-auto runs in a network-disabled sandbox",
                    "default": "suggest"
                },
                "images": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Image paths or data URIs to include (for multimodal tasks)"
                },
                "provider": {
                    "type": "string",
                    "description": "AI provider (openai, azure, gemini, ollama, mistral, deepseek, xai, groq, ...)"
                },
                "json_output": {
                    "type": "boolean",
                    "description": "Ask Codex for structured JSON output",
                    "default": false
                },
                "task_type": {
                    "type": "string",
                    "enum": [
                        "general",
                        "code-generation",
                        "code-explanation",
                        "debugging",
                        "refactoring",
                        "testing",
                        "security",
                        "documentation"
                    ],
                    "description": "Task classification used to sharpen the prompt",
                    "default": "general"
                },
                "additional_args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Extra Codex CLI arguments, passed through verbatim"
                }
            },
            "required": ["prompt"]
        }),
    }
}

/// Run a codex task to completion and report the structured outcome.
///
/// # Errors
///
/// Returns an error only when the arguments fail to deserialize or the
/// payload fails to serialize; execution failures are carried inside the
/// result with `is_error` set.
pub fn execute(config: &ServerConfig, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let request: CodexRequest =
        serde_json::from_value(arguments).context("invalid codex_agent arguments")?;

    let result = codex::codex_agent(&config.codex_bin, config.cleanup_images, request);
    json_result(&result, result.is_failure())
}
