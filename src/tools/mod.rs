//! Tool router — registers and dispatches MCP tool calls.
//!
//! Each tool is a function that takes JSON arguments and returns a
//! [`ToolCallResult`]. The router maintains the tool registry and
//! provides `list_tools()` / `call_tool()` for the MCP server.

pub mod agent;
pub mod interactive;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::server::{ContentItem, ServerConfig, ToolCallResult, ToolDefinition};

/// Wrap a serializable payload as a single pretty-printed JSON text item.
///
/// MCP tool results are content lists; both tools return exactly one text
/// block so the structured payload round-trips unchanged through clients
/// that only display text.
pub fn json_result(payload: &impl Serialize, is_error: bool) -> Result<ToolCallResult> {
    let text = serde_json::to_string_pretty(payload)?;
    Ok(ToolCallResult {
        content: vec![ContentItem {
            content_type: "text".to_owned(),
            text,
        }],
        is_error,
    })
}

/// Tool router that dispatches MCP tool calls to implementations.
pub struct ToolRouter {
    config: ServerConfig,
}

impl ToolRouter {
    /// Create a new tool router.
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// List all available tools with their JSON Schema definitions.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![agent::tool_definition(), interactive::tool_definition()]
    }

    /// Call a tool by name with the given JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments fail to deserialize or a payload
    /// fails to serialize. codex-level failures are not errors here: they
    /// come back as results with `is_error` set.
    pub fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolCallResult> {
        debug!(tool = name, "dispatching tool call");

        match name {
            "codex_agent" => agent::execute(&self.config, arguments),
            "codex_interactive" => interactive::execute(&self.config, arguments),
            _ => {
                let result = ToolCallResult {
                    content: vec![ContentItem {
                        content_type: "text".to_owned(),
                        text: format!("Unknown tool: {name}"),
                    }],
                    is_error: true,
                };
                Ok(result)
            }
        }
    }
}
