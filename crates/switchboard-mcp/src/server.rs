// crates/switchboard-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server transports for stdio and HTTP.
// Purpose: Expose the Switchboard catalog via JSON-RPC 2.0.
// Dependencies: axum, switchboard-config, switchboard-core, tokio
// ============================================================================

//! ## Overview
//! [`McpServer`] wires the credential store, identity authority, backend
//! client, and catalog from configuration, then serves JSON-RPC over the
//! configured transport. Every message goes through
//! [`crate::router::RequestRouter`].
//!
//! The stdio transport accepts Content-Length framed or newline-delimited
//! messages and answers in the framing of the first message. Each request
//! runs on its own task and responses are written as they complete, so
//! clients correlate by JSON-RPC id rather than by order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use serde_json::Value;
use switchboard_config::ServerAuditConfig;
use switchboard_config::ServerConfig;
use switchboard_config::ServerTransport;
use switchboard_config::SwitchboardConfig;
use switchboard_core::AuthContextResolver;
use switchboard_core::CredentialStore;
use switchboard_core::Dispatcher;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::audit::McpAuditSink;
use crate::audit::McpFileAuditSink;
use crate::audit::McpNoopAuditSink;
use crate::audit::McpStderrAuditSink;
use crate::backend::BackendClient;
use crate::catalog::build_catalog;
use crate::credential_store::FileCredentialStore;
use crate::identity::HttpIdentityAuthority;
use crate::router::INVALID_REQUEST;
use crate::router::JsonRpcResponse;
use crate::router::PAYLOAD_TOO_LARGE;
use crate::router::RequestRouter;
use crate::telemetry::McpMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header prefix for Content-Length framing (matched case-insensitively).
const CONTENT_LENGTH: &str = "content-length:";
/// Maximum length of one framing header line.
const MAX_HEADER_LINE_BYTES: u64 = 1024;
/// Responses buffered ahead of the stdio writer.
const WRITER_QUEUE_DEPTH: usize = 64;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server transport settings.
    server: ServerConfig,
    /// JSON-RPC router.
    router: RequestRouter,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when validation or initialization fails.
    pub fn from_config(config: SwitchboardConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let store: Arc<dyn CredentialStore> = Arc::new(
            FileCredentialStore::from_config(&config.session)
                .map_err(|err| McpServerError::Config(err.to_string()))?,
        );
        let authority = Arc::new(
            HttpIdentityAuthority::from_config(&config.identity)
                .map_err(|err| McpServerError::Init(err.to_string()))?,
        );
        let backend = Arc::new(
            BackendClient::from_config(&config.backend)
                .map_err(|err| McpServerError::Init(err.to_string()))?,
        );
        let catalog = build_catalog(&config, Arc::clone(&store), backend)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let audit = audit_sink(&config.server.audit)?;
        let router = RequestRouter::new(
            Dispatcher::new(catalog),
            AuthContextResolver::new(store, authority),
        )
        .with_audit(audit)
        .with_max_inflight(config.server.max_inflight);
        Ok(Self::new(config.server, router))
    }

    /// Builds a server from an already assembled router.
    #[must_use]
    pub const fn new(server: ServerConfig, router: RequestRouter) -> Self {
        Self {
            server,
            router,
        }
    }

    /// Routes request counters and latencies to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.router = self.router.with_metrics(metrics);
        self
    }

    /// Returns the request router.
    #[must_use]
    pub const fn router(&self) -> &RequestRouter {
        &self.router
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        let max_body_bytes = self.server.max_body_bytes;
        match self.server.transport {
            ServerTransport::Stdio => {
                serve_io(self.router, tokio::io::stdin(), tokio::io::stdout(), max_body_bytes).await
            }
            ServerTransport::Http => {
                let addr = self
                    .server
                    .bind_addr()
                    .map_err(|err| McpServerError::Config(err.to_string()))?;
                serve_http(addr, self.router, max_body_bytes).await
            }
        }
    }
}

/// Selects the audit sink for the configuration.
fn audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn McpAuditSink>, McpServerError> {
    if !config.enabled {
        return Ok(Arc::new(McpNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = McpFileAuditSink::new(Path::new(path))
                .map_err(|err| McpServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(McpStderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Message framing detected on the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` headers followed by the body.
    ContentLength,
    /// One JSON document per line.
    Line,
}

/// One inbound message.
#[derive(Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Framing the message arrived in.
    pub framing: Framing,
    /// Raw JSON bytes.
    pub body: Vec<u8>,
}

/// Serves JSON-RPC over a byte stream pair until the reader closes.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] on read or write failures and on
/// messages over `max_body_bytes`.
pub async fn serve_io<R, W>(
    router: RequestRouter,
    reader: R,
    writer: W,
    max_body_bytes: usize,
) -> Result<(), McpServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let (tx, mut rx) = mpsc::channel::<(Framing, Vec<u8>)>(WRITER_QUEUE_DEPTH);
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some((framing, payload)) = rx.recv().await {
            write_message(&mut writer, framing, &payload).await?;
        }
        Ok::<(), McpServerError>(())
    });

    let mut framing = None;
    let read_result = loop {
        match read_message(&mut reader, max_body_bytes).await {
            Ok(None) => break Ok(()),
            Ok(Some(message)) => {
                let mode = *framing.get_or_insert(message.framing);
                let router = router.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response =
                        router.handle_payload(ServerTransport::Stdio, &message.body).await;
                    if let Some(response) = response
                        && let Ok(payload) = serde_json::to_vec(&response)
                    {
                        let _ = tx.send((mode, payload)).await;
                    }
                });
            }
            Err(err) => break Err(err),
        }
    };

    // In-flight requests hold sender clones; the writer drains until they finish.
    drop(tx);
    let write_result = writer_task
        .await
        .map_err(|err| McpServerError::Transport(format!("stdio writer failed: {err}")))?;
    read_result.and(write_result)
}

/// Reads the next message; `None` at end of stream.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] on malformed framing, truncated
/// input, or oversized messages.
pub async fn read_message<R>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Option<InboundMessage>, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let line_limit = u64::try_from(max_body_bytes).unwrap_or(u64::MAX).saturating_add(2);
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = read_line_limited(reader, &mut line, line_limit).await?;
        if read == 0 {
            return Ok(None);
        }
        if !line.ends_with(b"\n") && u64::try_from(read).unwrap_or(u64::MAX) >= line_limit {
            return Err(McpServerError::Transport("payload too large".to_string()));
        }
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(length) = content_length(trimmed)? {
            return read_framed_body(reader, length, max_body_bytes).await.map(Some);
        }
        if trimmed.len() > max_body_bytes {
            return Err(McpServerError::Transport("payload too large".to_string()));
        }
        return Ok(Some(InboundMessage {
            framing: Framing::Line,
            body: trimmed.to_vec(),
        }));
    }
}

/// Reads one line of at most `limit` bytes.
async fn read_line_limited<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    limit: u64,
) -> Result<usize, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    (&mut *reader)
        .take(limit)
        .read_until(b'\n', line)
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))
}

/// Parses a `Content-Length` header line, if this is one.
fn content_length(line: &[u8]) -> Result<Option<usize>, McpServerError> {
    let prefix_len = CONTENT_LENGTH.len();
    if line.len() < prefix_len || !line[.. prefix_len].eq_ignore_ascii_case(CONTENT_LENGTH.as_bytes())
    {
        return Ok(None);
    }
    std::str::from_utf8(&line[prefix_len ..])
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .map(Some)
        .ok_or_else(|| McpServerError::Transport("invalid content length".to_string()))
}

/// Skips the remaining headers and reads a framed body.
async fn read_framed_body<R>(
    reader: &mut R,
    length: usize,
    max_body_bytes: usize,
) -> Result<InboundMessage, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = Vec::new();
    loop {
        header.clear();
        let read = read_line_limited(reader, &mut header, MAX_HEADER_LINE_BYTES).await?;
        if read == 0 {
            return Err(McpServerError::Transport("stdio closed".to_string()));
        }
        if header.trim_ascii().is_empty() {
            break;
        }
    }
    if length > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(InboundMessage {
        framing: Framing::ContentLength,
        body,
    })
}

/// Writes one response in the given framing.
async fn write_message<W>(
    writer: &mut W,
    framing: Framing,
    payload: &[u8],
) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    let write_failed =
        |_: std::io::Error| McpServerError::Transport("stdio write failed".to_string());
    match framing {
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).await.map_err(write_failed)?;
            writer.write_all(payload).await.map_err(write_failed)?;
        }
        Framing::Line => {
            writer.write_all(payload).await.map_err(write_failed)?;
            writer.write_all(b"\n").await.map_err(write_failed)?;
        }
    }
    writer.flush().await.map_err(write_failed)
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared server state for HTTP handlers.
struct HttpState {
    /// JSON-RPC router.
    router: RequestRouter,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Builds the HTTP application serving `POST /rpc`.
#[must_use]
pub fn http_app(router: RequestRouter, max_body_bytes: usize) -> Router {
    let state = Arc::new(HttpState {
        router,
        max_body_bytes,
    });
    Router::new()
        .route("/rpc", post(handle_http))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(
    addr: SocketAddr,
    router: RequestRouter,
    max_body_bytes: usize,
) -> Result<(), McpServerError> {
    let app = http_app(router, max_body_bytes);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| McpServerError::Transport(format!("http bind failed: {err}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|err| McpServerError::Transport(format!("http server failed: {err}")))
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<HttpState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let bytes = match body {
        Ok(bytes) if bytes.len() <= state.max_body_bytes => bytes,
        Ok(bytes) => {
            let response = state.router.reject_oversized(
                ServerTransport::Http,
                bytes.len(),
                state.max_body_bytes,
            );
            return json_reply(response);
        }
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let response = state.router.reject_oversized(
                ServerTransport::Http,
                state.max_body_bytes.saturating_add(1),
                state.max_body_bytes,
            );
            return json_reply(response);
        }
        Err(rejection) => {
            let response = JsonRpcResponse::failure(
                Value::Null,
                INVALID_REQUEST,
                format!("unreadable request body: {}", rejection.body_text()),
            );
            return json_reply(response);
        }
    };
    match state.router.handle_payload(ServerTransport::Http, &bytes).await {
        Some(response) => json_reply(response),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Maps a JSON-RPC response to an HTTP response.
fn json_reply(response: JsonRpcResponse) -> Response {
    let status = match response.error_code() {
        None => StatusCode::OK,
        Some(PAYLOAD_TOO_LARGE) => StatusCode::PAYLOAD_TOO_LARGE,
        Some(_) => StatusCode::BAD_REQUEST,
    };
    (status, axum::Json(response)).into_response()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
