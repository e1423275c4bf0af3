//! MCP Server — HTTP+SSE transport.
//!
//! Serves the same JSON-RPC dispatch as the stdio transport, but over HTTP
//! with Server-Sent Events:
//!
//! 1. Client opens `GET /sse` and holds the connection as an event stream.
//! 2. The server's first frame (`event: endpoint`) names the POST endpoint
//!    for this session: `/messages?session_id=<uuid>`.
//! 3. Client POSTs JSON-RPC requests to that endpoint; each POST is
//!    acknowledged with `202 Accepted`.
//! 4. Responses are pushed onto the session's event stream as
//!    `event: message` frames; idle streams get `: ping` comments.
//!
//! The HTTP layer is deliberately minimal: just enough of HTTP/1.1 for the
//! MCP SSE handshake, one thread per connection, no TLS. Every inbound
//! request is read through fixed byte budgets; oversized request lines and
//! header blocks are rejected with 414/431 before they are buffered.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};
use url::form_urlencoded;
use uuid::Uuid;

use crate::server::{ServerConfig, handle_message};
use crate::tools::ToolRouter;

/// Maximum accepted POST body (10 MiB), matching the stdio line limit.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Maximum accepted request line (8 KiB). Targets here are a short path
/// plus one hex session id; anything longer is garbage.
const MAX_REQUEST_LINE_BYTES: usize = 8 * 1024;

/// Maximum accepted header block (32 KiB cumulative across all fields).
const MAX_HEADER_BYTES: usize = 32 * 1024;

/// Maximum number of distinct header fields.
const MAX_HEADER_COUNT: usize = 100;

/// How long an event stream may sit idle before a keep-alive comment.
const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Open sessions: id → sender feeding that session's event stream.
type Sessions = HashMap<String, mpsc::Sender<String>>;
type SessionMap = Arc<Mutex<Sessions>>;

fn lock_sessions(sessions: &SessionMap) -> Result<MutexGuard<'_, Sessions>> {
    sessions
        .lock()
        .map_err(|_| anyhow::anyhow!("session registry lock poisoned"))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP+SSE transport for the MCP server.
pub struct SseServer {
    listener: TcpListener,
    router: Arc<ToolRouter>,
    sessions: SessionMap,
}

impl SseServer {
    /// Bind the listener without accepting connections yet.
    ///
    /// Binding separately from [`run`](Self::run) lets callers learn the
    /// actual port when 0 was requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be resolved or bound.
    pub fn bind(config: ServerConfig, host: &str, port: u16) -> Result<Self> {
        let listener =
            TcpListener::bind((host, port)).with_context(|| format!("failed to bind {host}:{port}"))?;
        Ok(Self {
            listener,
            router: Arc::new(ToolRouter::new(config)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// The socket address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("listener has no local address")
    }

    /// Accept connections until the process exits, one thread per
    /// connection. Accept errors are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the bound address cannot be reported.
    pub fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "codex-mcp SSE server listening");

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let router = Arc::clone(&self.router);
            let sessions = Arc::clone(&self.sessions);
            std::thread::spawn(move || {
                if let Err(e) = handle_connection(stream, &router, &sessions) {
                    debug!(error = %e, "connection closed with error");
                }
            });
        }

        Ok(())
    }
}

/// Bind and run the SSE transport. Convenience for the binary.
///
/// # Errors
///
/// Returns an error if binding fails.
pub fn run_sse_server(config: ServerConfig, host: &str, port: u16) -> Result<()> {
    SseServer::bind(config, host, port)?.run()
}

// ---------------------------------------------------------------------------
// Connection handling
// ---------------------------------------------------------------------------

fn handle_connection(
    mut stream: TcpStream,
    router: &ToolRouter,
    sessions: &SessionMap,
) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone().context("failed to clone stream")?);

    let request_line = match read_header_line(&mut reader, MAX_REQUEST_LINE_BYTES)? {
        HeaderLine::Line(line) => line,
        // Closed before sending anything.
        HeaderLine::Eof => return Ok(()),
        HeaderLine::Overflow => {
            warn!("request line over budget");
            return write_http_response(&mut stream, "414 URI Too Long", "Request line too long");
        }
    };

    let (method, target) = match parse_request_line(&request_line) {
        Ok(parts) => parts,
        Err(e) => {
            write_http_response(&mut stream, "400 Bad Request", "Malformed request")?;
            return Err(e);
        }
    };
    let (path, query) = split_target(&target);
    let Some(headers) = read_headers(&mut reader)? else {
        warn!(method = %method, path = %path, "header block over budget");
        return write_http_response(
            &mut stream,
            "431 Request Header Fields Too Large",
            "Header block too large",
        );
    };

    debug!(method = %method, path = %path, "http request");

    match (method.as_str(), path.as_str()) {
        ("GET", "/sse") => serve_event_stream(stream, sessions),
        ("POST", "/messages") => {
            serve_message_post(stream, &mut reader, &headers, &query, router, sessions)
        }
        ("GET" | "POST", "/sse" | "/messages") => {
            write_http_response(&mut stream, "405 Method Not Allowed", "Method not allowed")
        }
        _ => write_http_response(&mut stream, "404 Not Found", "Not found"),
    }
}

/// Serve one `GET /sse` connection: register a session, announce its POST
/// endpoint, then relay queued responses until the client disconnects.
fn serve_event_stream(stream: TcpStream, sessions: &SessionMap) -> Result<()> {
    let session_id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<String>();
    lock_sessions(sessions)?.insert(session_id.clone(), tx);
    info!(session = %session_id, "event stream opened");

    let result = relay_events(stream, &session_id, &rx);

    lock_sessions(sessions)?.remove(&session_id);
    info!(session = %session_id, "event stream closed");
    result
}

/// Pump responses (and keep-alive comments) onto an open event stream.
/// Returns when the client goes away or every sender is gone.
fn relay_events(mut stream: TcpStream, session_id: &str, rx: &mpsc::Receiver<String>) -> Result<()> {
    stream
        .write_all(
            b"HTTP/1.1 200 OK\r\n\
              Content-Type: text/event-stream\r\n\
              Cache-Control: no-cache\r\n\
              Connection: keep-alive\r\n\r\n",
        )
        .context("failed to write event stream headers")?;

    write_sse_event(
        &mut stream,
        "endpoint",
        &format!("/messages?session_id={session_id}"),
    )?;

    loop {
        match rx.recv_timeout(KEEP_ALIVE) {
            Ok(payload) => write_sse_event(&mut stream, "message", &payload)?,
            Err(RecvTimeoutError::Timeout) => {
                // Comment frame; stops idle proxies from reaping the socket.
                stream
                    .write_all(b": ping\n\n")
                    .context("keep-alive write failed")?;
                stream.flush().context("keep-alive flush failed")?;
            }
            // Sender gone: the registry entry was removed under us.
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

/// Handle one `POST /messages?session_id=...`: acknowledge with 202, then
/// dispatch the JSON-RPC body and queue any response on the session stream.
fn serve_message_post(
    mut stream: TcpStream,
    reader: &mut impl BufRead,
    headers: &HashMap<String, String>,
    query: &str,
    router: &ToolRouter,
    sessions: &SessionMap,
) -> Result<()> {
    let Some(session_id) = query_param(query, "session_id") else {
        return write_http_response(&mut stream, "400 Bad Request", "Missing session_id");
    };

    let sender = lock_sessions(sessions)?.get(&session_id).cloned();
    let Some(sender) = sender else {
        warn!(session = %session_id, "message for unknown session");
        return write_http_response(&mut stream, "404 Not Found", "Session not found");
    };

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if content_length == 0 {
        return write_http_response(&mut stream, "400 Bad Request", "Missing request body");
    }
    if content_length > MAX_BODY_BYTES {
        return write_http_response(&mut stream, "413 Payload Too Large", "Request body too large");
    }

    let mut body = vec![0u8; content_length];
    reader
        .read_exact(&mut body)
        .context("failed to read request body")?;
    let body = String::from_utf8(body).context("non-UTF-8 request body")?;

    debug!(session = %session_id, raw = %body, "received request");

    // Acknowledge receipt before dispatching: the result arrives on the
    // event stream once the (possibly long) codex run finishes.
    write_http_response(&mut stream, "202 Accepted", "Accepted")?;

    if let Some(response) = handle_message(router, &body) {
        let json = serde_json::to_string(&response).context("failed to serialize response")?;
        if sender.send(json).is_err() {
            warn!(session = %session_id, "event stream closed before response could be sent");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// HTTP plumbing
// ---------------------------------------------------------------------------

fn parse_request_line(line: &str) -> Result<(String, String)> {
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    if method.is_empty() || target.is_empty() {
        bail!("malformed request line: {line:?}");
    }
    Ok((method.to_owned(), target.to_owned()))
}

fn split_target(target: &str) -> (String, String) {
    match target.split_once('?') {
        Some((path, query)) => (path.to_owned(), query.to_owned()),
        None => (target.to_owned(), String::new()),
    }
}

/// Outcome of one bounded line read.
#[derive(Debug)]
enum HeaderLine {
    /// A complete line, terminator included.
    Line(String),
    /// Clean close before any byte of this line.
    Eof,
    /// The line did not finish within the byte budget.
    Overflow,
}

/// Read one `\n`-terminated line, giving up once the line would exceed
/// `budget` bytes. Nothing past the budget is consumed, so a hostile peer
/// cannot make the server buffer an arbitrarily large line.
fn read_header_line(reader: &mut impl BufRead, budget: usize) -> Result<HeaderLine> {
    let mut line = String::new();
    loop {
        let available = reader.fill_buf().context("failed to read request")?;
        if available.is_empty() {
            if line.is_empty() {
                return Ok(HeaderLine::Eof);
            }
            bail!("connection closed mid-request");
        }
        let (consumed, found_newline) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        if line.len() + consumed > budget {
            return Ok(HeaderLine::Overflow);
        }
        let chunk =
            std::str::from_utf8(&available[..consumed]).context("non-UTF-8 request header")?;
        line.push_str(chunk);
        reader.consume(consumed);
        if found_newline {
            return Ok(HeaderLine::Line(line));
        }
    }
}

/// Read the header block, enforcing the cumulative byte budget and the
/// field-count cap. Returns `None` when either is exceeded; the caller
/// answers 431.
fn read_headers(reader: &mut impl BufRead) -> Result<Option<HashMap<String, String>>> {
    let mut headers = HashMap::new();
    let mut remaining = MAX_HEADER_BYTES;
    loop {
        let line = match read_header_line(reader, remaining)? {
            HeaderLine::Line(line) => line,
            HeaderLine::Eof => bail!("connection closed mid-headers"),
            HeaderLine::Overflow => return Ok(None),
        };
        remaining = remaining.saturating_sub(line.len());
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok(Some(headers));
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
        if headers.len() > MAX_HEADER_COUNT {
            return Ok(None);
        }
    }
}

/// Extract a query parameter from a raw query string, percent-decoded.
fn query_param(query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn write_http_response(out: &mut impl Write, status: &str, body: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    out.write_all(response.as_bytes())
        .context("failed to write response")?;
    out.flush().context("failed to flush response")?;
    Ok(())
}

/// Write one SSE frame. Multi-line data is split across `data:` lines per
/// the SSE framing rules.
fn write_sse_event(out: &mut impl Write, event: &str, data: &str) -> Result<()> {
    let mut frame = format!("event: {event}\n");
    for line in data.lines() {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    out.write_all(frame.as_bytes()).context("event write failed")?;
    out.flush().context("event flush failed")?;
    Ok(())
}
