//! SSE transport integration tests.
//!
//! Starts the real listener on an ephemeral port and speaks raw HTTP to it:
//! one connection holds the event stream, a second one POSTs JSON-RPC
//! messages, and responses come back as `message` events.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::json;

use codex_mcp::server::ServerConfig;
use codex_mcp::sse::SseServer;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

fn start_server() -> SocketAddr {
    let server = SseServer::bind(ServerConfig::default(), "127.0.0.1", 0).expect("bind port 0");
    let addr = server.local_addr().expect("bound address");
    std::thread::spawn(move || server.run());
    addr
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(CLIENT_TIMEOUT))
        .expect("set read timeout");
    stream
}

/// Read an HTTP response head, returning the status line.
fn read_head(reader: &mut impl BufRead) -> String {
    let mut status = String::new();
    reader.read_line(&mut status).expect("read status line");
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header line");
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            return status.trim_end().to_owned();
        }
    }
}

/// Read one SSE frame, skipping keep-alive comments. Returns (event, data).
fn read_event(reader: &mut impl BufRead) -> (String, String) {
    let mut event = String::new();
    let mut data = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).expect("read event line") == 0 {
            panic!("stream closed mid-event");
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if !event.is_empty() || !data.is_empty() {
                return (event, data);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("event: ") {
            event = rest.to_owned();
        } else if let Some(rest) = line.strip_prefix("data: ") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest);
        }
        // Anything else (": ping" comments) is ignored.
    }
}

/// POST a JSON-RPC body to the session endpoint, returning the status line.
fn post_message(addr: SocketAddr, endpoint: &str, body: &str) -> String {
    let mut stream = connect(addr);
    let request = format!(
        "POST {endpoint} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).expect("send request");
    let mut reader = BufReader::new(stream);
    read_head(&mut reader)
}

#[test]
fn test_sse_handshake_and_initialize_round_trip() {
    let addr = start_server();

    let stream = connect(addr);
    let mut sse_reader = BufReader::new(stream.try_clone().expect("clone stream"));
    {
        let mut writer = stream.try_clone().expect("clone stream");
        writer
            .write_all(
                b"GET /sse HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n",
            )
            .expect("send GET");
    }

    let status = read_head(&mut sse_reader);
    assert!(status.contains("200 OK"), "unexpected status: {status}");

    let (event, endpoint) = read_event(&mut sse_reader);
    assert_eq!(event, "endpoint");
    assert!(
        endpoint.starts_with("/messages?session_id="),
        "unexpected endpoint: {endpoint}"
    );

    // Initialize goes over the POST channel; the answer arrives as an event.
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {"protocolVersion": "2025-06-18", "capabilities": {}}
    })
    .to_string();
    let status = post_message(addr, &endpoint, &body);
    assert!(status.contains("202"), "unexpected status: {status}");

    let (event, data) = read_event(&mut sse_reader);
    assert_eq!(event, "message");
    let response: serde_json::Value = serde_json::from_str(&data).expect("JSON response");
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["serverInfo"]["name"], "codex-mcp");

    // A second message on the same session also round-trips.
    let body = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string();
    let status = post_message(addr, &endpoint, &body);
    assert!(status.contains("202"), "unexpected status: {status}");

    let (event, data) = read_event(&mut sse_reader);
    assert_eq!(event, "message");
    let response: serde_json::Value = serde_json::from_str(&data).expect("JSON response");
    assert_eq!(response["id"], 2);
    let tools = response["result"]["tools"].as_array().expect("tool list");
    assert_eq!(tools.len(), 2);
}

#[test]
fn test_sse_notification_produces_no_event() {
    let addr = start_server();

    let stream = connect(addr);
    let mut sse_reader = BufReader::new(stream.try_clone().expect("clone stream"));
    stream
        .try_clone()
        .expect("clone stream")
        .write_all(b"GET /sse HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .expect("send GET");

    read_head(&mut sse_reader);
    let (_, endpoint) = read_event(&mut sse_reader);

    let notification = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    let status = post_message(addr, &endpoint, &notification);
    assert!(status.contains("202"), "unexpected status: {status}");

    // A follow-up ping must be the next event on the stream: nothing was
    // queued for the notification.
    let ping = json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}).to_string();
    let status = post_message(addr, &endpoint, &ping);
    assert!(status.contains("202"), "unexpected status: {status}");

    let (event, data) = read_event(&mut sse_reader);
    assert_eq!(event, "message");
    let response: serde_json::Value = serde_json::from_str(&data).expect("JSON response");
    assert_eq!(response["id"], 3);
}

#[test]
fn test_sse_unknown_session_is_rejected() {
    let addr = start_server();
    let status = post_message(addr, "/messages?session_id=nope", "{}");
    assert!(status.contains("404"), "unexpected status: {status}");
}

#[test]
fn test_sse_unknown_path_is_rejected() {
    let addr = start_server();
    let mut stream = connect(addr);
    stream
        .write_all(b"GET /other HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .expect("send GET");
    let mut reader = BufReader::new(stream);
    let status = read_head(&mut reader);
    assert!(status.contains("404"), "unexpected status: {status}");
}

#[test]
fn test_sse_method_not_allowed() {
    let addr = start_server();
    let mut stream = connect(addr);
    stream
        .write_all(b"POST /sse HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
        .expect("send POST");
    let mut reader = BufReader::new(stream);
    let status = read_head(&mut reader);
    assert!(status.contains("405"), "unexpected status: {status}");
}

/// Send a raw request and return the status line, if the server produced
/// one before closing. The server may tear the socket down while the
/// client is still sending; that also counts as a rejection.
fn send_expecting_rejection(addr: SocketAddr, request: &[u8]) -> Option<String> {
    let mut stream = connect(addr);
    let _ = stream.write_all(request);
    let _ = stream.flush();

    let mut reader = BufReader::new(stream);
    let mut status = String::new();
    match reader.read_line(&mut status) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(status.trim_end().to_owned()),
    }
}

#[test]
fn test_sse_oversized_header_is_rejected() {
    let addr = start_server();

    // One header field far past the 32 KiB budget. The server must stop
    // reading at the budget and reject, never buffer the field wholesale
    // and serve the event stream.
    let mut request = String::from("GET /sse HTTP/1.1\r\nHost: localhost\r\nX-Junk: ");
    request.push_str(&"a".repeat(64 * 1024));
    request.push_str("\r\n\r\n");

    if let Some(status) = send_expecting_rejection(addr, request.as_bytes()) {
        assert!(
            status.starts_with("HTTP/1.1 431"),
            "expected 431 rejection, got: {status}"
        );
    }
}

#[test]
fn test_sse_oversized_request_line_is_rejected() {
    let addr = start_server();

    let mut request = String::from("GET /");
    request.push_str(&"a".repeat(16 * 1024));
    request.push_str(" HTTP/1.1\r\n\r\n");

    if let Some(status) = send_expecting_rejection(addr, request.as_bytes()) {
        assert!(
            status.starts_with("HTTP/1.1 414"),
            "expected 414 rejection, got: {status}"
        );
    }
}

#[test]
fn test_sse_large_header_within_budget_is_served() {
    let addr = start_server();

    let stream = connect(addr);
    let mut sse_reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request = String::from("GET /sse HTTP/1.1\r\nHost: localhost\r\nX-Padding: ");
    request.push_str(&"a".repeat(16 * 1024));
    request.push_str("\r\n\r\n");
    stream
        .try_clone()
        .expect("clone stream")
        .write_all(request.as_bytes())
        .expect("send GET");

    let status = read_head(&mut sse_reader);
    assert!(status.contains("200 OK"), "unexpected status: {status}");
    let (event, _) = read_event(&mut sse_reader);
    assert_eq!(event, "endpoint");
}
