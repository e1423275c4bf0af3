//! Command translator for the codex CLI.
//!
//! Maps a structured task request onto an argument vector for the external
//! `codex` executable, runs it synchronously, and folds the outcome into a
//! structured [`ExecutionResult`]. There is deliberately no retry, no
//! timeout, and no parsing of codex's stdout beyond trimming whitespace:
//! the child's output is opaque to this layer.
//!
//! # Argument order contract
//!
//! The codex CLI is order-sensitive, so [`build_command_line`] emits flags
//! in a fixed sequence: program, `--quiet`, `--json`, `--model`,
//! `--provider`, `--approval-mode` (omitted for the codex default
//! `suggest`), one `--image <path>` per image, pass-through arguments
//! verbatim, and the prompt as the final positional argument.

pub mod images;
pub mod prompt;

use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CodexError, CodexResult};

pub use images::ResolvedImages;
pub use prompt::{TaskKind, optimize_prompt};

/// Name the codex binary is looked up under on PATH.
pub const CODEX_BIN: &str = "codex";

/// Model requested when the caller does not name one.
pub const DEFAULT_MODEL: &str = "o4-mini";

/// Trust level passed to codex controlling how much unattended action the
/// agent may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    /// Only suggests changes; every action needs approval (codex default).
    #[default]
    Suggest,
    /// Reads and writes files automatically, asks before shell commands.
    AutoEdit,
    /// Full autonomy inside codex's network-disabled sandbox.
    FullAuto,
}

impl ApprovalMode {
    /// Flag value spelled the way the codex CLI expects it.
    pub const fn as_flag(self) -> &'static str {
        match self {
            Self::Suggest => "suggest",
            Self::AutoEdit => "auto-edit",
            Self::FullAuto => "full-auto",
        }
    }
}

/// A structured codex task request.
///
/// Deserialized straight from `tools/call` arguments; field defaults mirror
/// the tool contract (model `o4-mini`, approval mode `suggest`, everything
/// else empty). An explicitly empty `model` or `provider` omits the
/// corresponding flag so codex falls back to its own configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodexRequest {
    /// The task or question to send to codex. Required, non-empty.
    pub prompt: String,
    /// AI model to use (e.g. "o4-mini", "o4-preview", "gpt-4.1").
    pub model: String,
    /// Agent autonomy level.
    pub approval_mode: ApprovalMode,
    /// Image paths or data URIs, in order.
    pub images: Vec<String>,
    /// AI provider (openai, azure, gemini, ollama, ...).
    pub provider: Option<String>,
    /// Ask codex for structured JSON output.
    pub json_output: bool,
    /// Task classification; selects the prompt prefix only.
    pub task_type: TaskKind,
    /// Extra CLI arguments appended verbatim, unvalidated.
    pub additional_args: Vec<String>,
    /// Run codex non-interactively. Not part of the wire contract: the
    /// agent tool always runs quiet, the interactive tool never does.
    #[serde(skip, default = "default_quiet")]
    pub quiet: bool,
}

const fn default_quiet() -> bool {
    true
}

impl Default for CodexRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: DEFAULT_MODEL.to_owned(),
            approval_mode: ApprovalMode::Suggest,
            images: Vec::new(),
            provider: None,
            json_output: false,
            task_type: TaskKind::General,
            additional_args: Vec::new(),
            quiet: true,
        }
    }
}

/// Outcome of one codex invocation.
///
/// Serialized with fixed wire keys (`status`, `output`, `stderr`,
/// `command`, `error`, `exit_code`); optional failure fields disappear
/// from the JSON when absent, so a validation failure carries only
/// `status` and `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// codex exited 0.
    Success {
        /// Trimmed stdout of the child.
        output: String,
        /// Raw stderr (progress output, diagnostics).
        stderr: String,
        /// The exact command line that ran, space-joined.
        command: String,
    },
    /// codex could not be run, exited non-zero, or the request was invalid.
    #[serde(rename = "error")]
    Failure {
        /// Human-readable description of what went wrong.
        error: String,
        /// Partial stdout captured before the failure, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        /// Partial stderr captured before the failure, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
        /// The child's exit code (absent when it never launched or was
        /// killed by a signal).
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        /// The command line involved, when one was built.
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
}

impl ExecutionResult {
    /// True when this result reports a failure.
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Failure carrying only an error message (no command was involved).
    fn bare_failure(error: String) -> Self {
        Self::Failure {
            error,
            output: None,
            stderr: None,
            exit_code: None,
            command: None,
        }
    }
}

/// Advisory record describing an interactive codex session.
///
/// Returned by the `codex_interactive` tool; never the product of an
/// actual process spawn.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    /// Always `"info"`.
    pub status: &'static str,
    pub message: &'static str,
    /// The command line that *would* start the session, space-joined.
    pub command: String,
    pub note: &'static str,
    pub instructions: [&'static str; 3],
}

/// Locate the codex binary on PATH.
///
/// # Errors
///
/// Returns [`CodexError::CodexNotFound`] (whose message carries the npm
/// install hint) when the lookup fails.
pub fn codex_available() -> CodexResult<PathBuf> {
    which::which(CODEX_BIN).map_err(|_| CodexError::CodexNotFound)
}

/// Space-join an argument vector for logging and result reporting.
///
/// No shell quoting is applied; this is a display form, not something to
/// feed back to a shell.
pub fn join_argv(argv: &[String]) -> String {
    argv.join(" ")
}

/// Build the codex argument vector for `request`.
///
/// `bin` is the program name or path placed first; `images` must already be
/// resolved (see [`ResolvedImages::resolve`]). The prompt is appended only
/// when non-empty, which lets the interactive builder share this function.
/// See the module docs for the order contract. `additional_args` and the
/// prompt are passed through without escaping or validation.
pub fn build_command_line(
    bin: &str,
    request: &CodexRequest,
    images: &ResolvedImages,
) -> Vec<String> {
    let mut argv = vec![bin.to_owned()];

    if request.quiet {
        argv.push("--quiet".to_owned());
    }

    if request.json_output {
        argv.push("--json".to_owned());
    }

    if !request.model.is_empty() {
        argv.push("--model".to_owned());
        argv.push(request.model.clone());
    }

    if let Some(provider) = request.provider.as_deref().filter(|p| !p.is_empty()) {
        argv.push("--provider".to_owned());
        argv.push(provider.to_owned());
    }

    // The codex default is omitted so the tool's own default behavior is
    // preserved even if it changes upstream.
    if request.approval_mode != ApprovalMode::Suggest {
        argv.push("--approval-mode".to_owned());
        argv.push(request.approval_mode.as_flag().to_owned());
    }

    for path in images.paths() {
        argv.push("--image".to_owned());
        argv.push(path.display().to_string());
    }

    argv.extend(request.additional_args.iter().cloned());

    if !request.prompt.is_empty() {
        argv.push(request.prompt.clone());
    }

    argv
}

/// Run an argument vector to completion, capturing stdout and stderr.
///
/// Blocks the calling thread until the child exits; no timeout is applied,
/// so a hung child hangs the request. Failures are folded into
/// [`ExecutionResult::Failure`], never raised; there is exactly one attempt
/// and no recovery.
pub fn execute(argv: &[String]) -> ExecutionResult {
    let command_line = join_argv(argv);

    let Some((program, args)) = argv.split_first() else {
        return ExecutionResult::bare_failure("empty command line".to_owned());
    };

    info!(command = %command_line, "executing codex");

    let output = match Command::new(program).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "failed to launch codex");
            return ExecutionResult::Failure {
                error: CodexError::Launch { source: e }.to_string(),
                output: None,
                stderr: None,
                exit_code: None,
                command: Some(command_line),
            };
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        return ExecutionResult::Success {
            output: stdout.trim().to_owned(),
            stderr,
            command: command_line,
        };
    }

    let status = output
        .status
        .code()
        .map_or_else(|| output.status.to_string(), |code| code.to_string());
    warn!(status = %status, "codex exited non-zero");

    ExecutionResult::Failure {
        error: CodexError::ChildProcess {
            command: command_line.clone(),
            status,
        }
        .to_string(),
        output: Some(stdout),
        stderr: Some(stderr),
        exit_code: output.status.code(),
        command: Some(command_line),
    }
}

/// The `codex_agent` entry point: validate, optimize, build, execute.
///
/// An empty prompt short-circuits into a Failure before anything is
/// resolved or spawned. When `cleanup_images` is set, temp files created
/// for data-URI images are removed best-effort after the child exits.
pub fn codex_agent(bin: &str, cleanup_images: bool, mut request: CodexRequest) -> ExecutionResult {
    if request.prompt.is_empty() {
        return ExecutionResult::bare_failure("Missing required parameter: prompt".to_owned());
    }

    request.prompt = optimize_prompt(&request.prompt, request.task_type);
    request.quiet = true;

    let mut resolved = match ResolvedImages::resolve(&request.images) {
        Ok(resolved) => resolved,
        Err(e) => return ExecutionResult::bare_failure(e.to_string()),
    };

    let argv = build_command_line(bin, &request, &resolved);
    let result = execute(&argv);

    if cleanup_images {
        resolved.cleanup();
    }

    result
}

/// Describe the command that *would* start an interactive codex session.
///
/// Purely advisory: nothing is spawned and no temp files are created.
/// `--quiet`, `--json`, images, and pass-through arguments never apply to
/// an interactive session, so they are stripped whatever the caller set;
/// the request's prompt becomes the optional initial prompt.
pub fn session_info(bin: &str, request: &CodexRequest) -> SessionInfo {
    let interactive = CodexRequest {
        quiet: false,
        json_output: false,
        images: Vec::new(),
        additional_args: Vec::new(),
        ..request.clone()
    };

    let argv = build_command_line(bin, &interactive, &ResolvedImages::default());

    SessionInfo {
        status: "info",
        message: "Interactive Codex session would be started with the following command:",
        command: join_argv(&argv),
        note: "This requires terminal access. For automated tasks, use codex_agent instead.",
        instructions: [
            "Run this command in your terminal to start the interactive session",
            "Type 'exit' or press Ctrl+C to end the session",
            "Use different approval modes for varying levels of autonomy",
        ],
    }
}
