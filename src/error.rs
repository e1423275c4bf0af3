//! Error types for the codex-mcp crate.

use std::path::PathBuf;

/// Codex-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum CodexError {
    /// codex binary not found on PATH.
    #[error("'codex' command not found in PATH; install the OpenAI Codex CLI: npm install -g @openai/codex")]
    CodexNotFound,

    /// An image reference carried a data URI that could not be decoded.
    #[error("invalid image data URI: {reason}")]
    InvalidImage { reason: String },

    /// The codex process could not be started at all.
    #[error("failed to launch codex: {source}")]
    Launch {
        #[source]
        source: std::io::Error,
    },

    /// codex started but exited with a non-zero status.
    #[error("command '{command}' returned non-zero exit status {status}")]
    ChildProcess { command: String, status: String },

    /// I/O error with context.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for codex-mcp operations.
pub type CodexResult<T> = Result<T, CodexError>;
