//! codex-mcp -- MCP server wrapping the OpenAI Codex CLI.
//!
//! Usage: codex-mcp [--mode stdio|sse] [--host localhost] [--port 8000]

use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use codex_mcp::server::ServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// JSON-RPC over stdin/stdout.
    Stdio,
    /// HTTP with Server-Sent Events.
    Sse,
}

/// MCP server exposing the OpenAI Codex CLI as remote-callable coding tools.
#[derive(Debug, Parser)]
#[command(name = "codex-mcp", version, about)]
struct Cli {
    /// Server transport.
    #[arg(long, value_enum, default_value = "stdio")]
    mode: Mode,

    /// Port number for SSE mode.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Host address for SSE mode.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Remove temp files created for data-URI images after each call.
    #[arg(long)]
    cleanup_images: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr so it does not interfere with MCP stdio.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Refuse to start without the codex CLI on PATH; the error message
    // carries the npm install hint.
    let codex_path = codex_mcp::codex::codex_available()?;
    debug!(path = %codex_path.display(), "codex binary found");

    let config = ServerConfig {
        cleanup_images: cli.cleanup_images,
        ..ServerConfig::default()
    };

    match cli.mode {
        Mode::Stdio => {
            info!("starting in stdio mode; tools: codex_agent, codex_interactive");
            codex_mcp::run_stdio_server(config)
        }
        Mode::Sse => {
            info!(
                host = %cli.host,
                port = cli.port,
                "starting in SSE mode; tools: codex_agent, codex_interactive"
            );
            codex_mcp::run_sse_server(config, &cli.host, cli.port)
        }
    }
}
