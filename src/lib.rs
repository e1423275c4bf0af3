//! `codex-mcp` — MCP server for the OpenAI Codex CLI.
//!
//! Exposes the codex coding agent as a pair of remote-callable tools via the
//! Model Context Protocol (MCP), either over stdio (JSON-RPC 2.0,
//! newline-delimited) or over HTTP with Server-Sent Events.
//!
//! # Tools
//!
//! - `codex_agent` — run a coding task to completion and return the output
//! - `codex_interactive` — describe the command for a terminal REPL session
//!
//! # Architecture
//!
//! ```text
//! stdin (JSON-RPC) ──┐
//!                    ├→ handle_message → ToolRouter → codex translator
//! HTTP POST /messages┘                                     ↓
//!                                              codex subprocess (blocking)
//! stdout / SSE event stream ←──────────────────────────────┘
//! ```
//!
//! The translator maps structured requests onto a codex argument vector,
//! runs the binary synchronously, and folds exit status, stdout, and stderr
//! into a structured result. Nothing in here parses codex's output.

pub mod codex;
pub mod error;
pub mod server;
pub mod sse;
pub mod tools;

pub use error::{CodexError, CodexResult};
pub use server::run_stdio_server;
pub use sse::run_sse_server;
