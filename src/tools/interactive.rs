//! codex_interactive tool — describe how to start a codex REPL session.
//!
//! An MCP server has no terminal to hand over, so this tool never spawns
//! anything. It builds the exact command line an interactive session would
//! use and returns it with usage instructions.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::codex::{self, ApprovalMode, CodexRequest, DEFAULT_MODEL};
use crate::server::{ServerConfig, ToolCallResult, ToolDefinition};

use super::json_result;

/// Parameters for the codex_interactive tool. All optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct InteractiveParams {
    initial_prompt: Option<String>,
    model: String,
    approval_mode: ApprovalMode,
    provider: Option<String>,
}

impl Default for InteractiveParams {
    fn default() -> Self {
        Self {
            initial_prompt: None,
            model: DEFAULT_MODEL.to_owned(),
            approval_mode: ApprovalMode::Suggest,
            provider: None,
        }
    }
}

/// Returns the JSON Schema tool definition for `codex_interactive`.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "codex_interactive".to_owned(),
        description: "Start an interactive Codex session (REPL mode) for iterative \
                      development and exploration. Interactive sessions need terminal \
                      access, so this reports the exact command to run in your own \
                      terminal rather than launching one."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "initial_prompt": {
                    "type": "string",
                    "description": "Optional initial prompt to start the session with"
                },
                "model": {
                    "type": "string",
                    "description": "AI model to use",
                    "default": "o4-mini"
                },
                "approval_mode": {
                    "type": "string",
                    "enum": ["suggest", "auto-edit", "full-auto"],
                    "description": "Agent autonomy level",
                    "default": "suggest"
                },
                "provider": {
                    "type": "string",
                    "description": "AI provider to use"
                }
            }
        }),
    }
}

/// Describe the interactive session command. Never spawns a process.
///
/// # Errors
///
/// Returns an error only when the arguments fail to deserialize or the
/// payload fails to serialize.
pub fn execute(config: &ServerConfig, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: InteractiveParams =
        serde_json::from_value(arguments).context("invalid codex_interactive arguments")?;

    let request = CodexRequest {
        prompt: params.initial_prompt.unwrap_or_default(),
        model: params.model,
        approval_mode: params.approval_mode,
        provider: params.provider,
        quiet: false,
        ..CodexRequest::default()
    };

    let info = codex::session_info(&config.codex_bin, &request);
    json_result(&info, false)
}
