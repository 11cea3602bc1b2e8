// crates/switchboard-mcp/src/router.rs
// ============================================================================
// Module: JSON-RPC Request Router
// Description: Transport-independent handling of MCP JSON-RPC messages.
// Purpose: Resolve identity per request and route discovery and invocation.
// Dependencies: serde, serde_json, switchboard-core, time, tokio
// ============================================================================

//! ## Overview
//! [`RequestRouter`] turns one raw JSON-RPC message into at most one
//! response. It resolves a fresh auth context for every `tools/list` and
//! `tools/call`, so permission changes apply from the next request on.
//!
//! ## Invariants
//! - Tool failures are normal results flagged with `isError: true`; only
//!   protocol faults become JSON-RPC errors.
//! - Notifications (requests without an `id`) never produce a response.
//! - Every message is audited; tokens and arguments are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use switchboard_config::ServerTransport;
use switchboard_core::AuthContext;
use switchboard_core::AuthContextResolver;
use switchboard_core::Dispatcher;
use switchboard_core::Resolution;
use switchboard_core::ToolDefinition;
use time::OffsetDateTime;
use tokio::sync::Semaphore;

use crate::audit::AuthResolutionEvent;
use crate::audit::McpAuditEvent;
use crate::audit::McpAuditEventParams;
use crate::audit::McpAuditSink;
use crate::audit::McpNoopAuditSink;
use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpMetrics;
use crate::telemetry::McpOutcome;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol revision announced when the client asks for an unknown one.
pub const PROTOCOL_VERSION: &str = "2025-06-18";
/// Protocol revisions accepted from clients.
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];
/// Server name reported by `initialize`.
const SERVER_NAME: &str = "switchboard";
/// Default concurrent request limit.
const DEFAULT_MAX_INFLIGHT: usize = 64;

/// Malformed JSON or JSON-RPC envelope.
pub const INVALID_REQUEST: i64 = -32600;
/// Unknown JSON-RPC method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Malformed method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Response could not be produced.
pub const INTERNAL_ERROR: i64 = -32603;
/// Request body over the configured limit.
pub const PAYLOAD_TOO_LARGE: i64 = -32070;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Returns the error code, if this is an error response.
    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref().map(|error| error.code)
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Visible tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
    /// Set when the tool could not run or failed.
    #[serde(rename = "isError")]
    is_error: bool,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text tool output.
    Text {
        /// Rendered output.
        text: String,
    },
}

/// Per-message facts collected for audit and metrics.
struct Handled {
    /// Response to send, if any.
    response: Option<JsonRpcResponse>,
    /// Method classification.
    method: McpMethod,
    /// Tool name for `tools/call`.
    tool: Option<String>,
    /// Failure label when the request or tool failed.
    error_kind: Option<&'static str>,
}

impl Handled {
    /// Wraps a response for a classified method.
    const fn reply(method: McpMethod, response: JsonRpcResponse) -> Self {
        Self {
            response: Some(response),
            method,
            tool: None,
            error_kind: None,
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Routes JSON-RPC messages to discovery and dispatch.
#[derive(Clone)]
pub struct RequestRouter {
    /// Guarded tool execution.
    dispatcher: Dispatcher,
    /// Per-request identity resolution.
    resolver: AuthContextResolver,
    /// Audit sink.
    audit: Arc<dyn McpAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn McpMetrics>,
    /// Concurrent request limit.
    inflight: Arc<Semaphore>,
}

impl RequestRouter {
    /// Creates a router with no-op audit and metrics sinks.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, resolver: AuthContextResolver) -> Self {
        Self {
            dispatcher,
            resolver,
            audit: Arc::new(McpNoopAuditSink),
            metrics: Arc::new(NoopMetrics),
            inflight: Arc::new(Semaphore::new(DEFAULT_MAX_INFLIGHT)),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn McpAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Sets the number of requests handled at once. Zero is treated as one.
    #[must_use]
    pub fn with_max_inflight(mut self, max_inflight: usize) -> Self {
        self.inflight = Arc::new(Semaphore::new(max_inflight.max(1)));
        self
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Resolves the current caller, recording an `auth_resolution` event.
    pub async fn resolve(&self, request_id: Option<String>) -> Resolution {
        let resolution = self.resolver.resolve_detailed(OffsetDateTime::now_utc()).await;
        self.audit.record_auth(&AuthResolutionEvent::new(request_id, &resolution));
        resolution
    }

    /// Returns the definitions visible to the current caller.
    pub async fn visible_tools(&self) -> Vec<ToolDefinition> {
        let ctx = self.resolve(None).await.context;
        self.definitions(ctx.as_ref())
    }

    /// Handles one raw JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_payload(
        &self,
        transport: ServerTransport,
        bytes: &[u8],
    ) -> Option<JsonRpcResponse> {
        let started = Instant::now();
        let _permit = self.inflight.acquire().await.ok();
        let (request_id, handled) = match parse_request(bytes) {
            Ok(request) => {
                let request_id = request.id.as_ref().map(render_id);
                (request_id.clone(), self.route(request, request_id).await)
            }
            Err(response) => (
                None,
                Handled {
                    response: Some(response),
                    method: McpMethod::Invalid,
                    tool: None,
                    error_kind: Some("invalid_request"),
                },
            ),
        };
        self.observe(transport, request_id, bytes.len(), &handled, started);
        handled.response
    }

    /// Builds and audits the response for an oversized request.
    #[must_use]
    pub fn reject_oversized(
        &self,
        transport: ServerTransport,
        request_bytes: usize,
        max_body_bytes: usize,
    ) -> JsonRpcResponse {
        let response = JsonRpcResponse::failure(
            Value::Null,
            PAYLOAD_TOO_LARGE,
            format!("request body exceeds {max_body_bytes} bytes"),
        );
        let handled = Handled {
            response: Some(response.clone()),
            method: McpMethod::Invalid,
            tool: None,
            error_kind: Some("payload_too_large"),
        };
        self.observe(transport, None, request_bytes, &handled, Instant::now());
        response
    }

    /// Routes a parsed request.
    async fn route(&self, request: JsonRpcRequest, request_id: Option<String>) -> Handled {
        let method = McpMethod::classify(&request.method);
        let Some(id) = request.id else {
            return Handled {
                response: None,
                method,
                tool: None,
                error_kind: None,
            };
        };
        if request.jsonrpc != "2.0" {
            let response =
                JsonRpcResponse::failure(id, INVALID_REQUEST, "invalid json-rpc version");
            return Handled {
                error_kind: Some("invalid_request"),
                ..Handled::reply(McpMethod::Invalid, response)
            };
        }
        match method {
            McpMethod::Initialize => {
                let result = initialize_result(request.params.as_ref());
                Handled::reply(method, JsonRpcResponse::success(id, result))
            }
            McpMethod::Ping => Handled::reply(method, JsonRpcResponse::success(id, json!({}))),
            McpMethod::ToolsList => {
                let ctx = self.resolve(request_id).await.context;
                let result = ToolListResult {
                    tools: self.definitions(ctx.as_ref()),
                };
                Handled::reply(method, to_response(id, &result))
            }
            McpMethod::ToolsCall => self.call_tool(id, request.params, request_id).await,
            McpMethod::Notification | McpMethod::Invalid | McpMethod::Other => Handled {
                error_kind: Some("method_not_found"),
                ..Handled::reply(
                    method,
                    JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "method not found"),
                )
            },
        }
    }

    /// Handles `tools/call`.
    async fn call_tool(
        &self,
        id: Value,
        params: Option<Value>,
        request_id: Option<String>,
    ) -> Handled {
        let Ok(call) = serde_json::from_value::<ToolCallParams>(params.unwrap_or(Value::Null))
        else {
            return Handled {
                error_kind: Some("invalid_params"),
                ..Handled::reply(
                    McpMethod::ToolsCall,
                    JsonRpcResponse::failure(id, INVALID_PARAMS, "invalid tool params"),
                )
            };
        };
        let arguments = match call.arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        let ctx = self.resolve(request_id).await.context;
        let (result, error_kind) =
            match self.dispatcher.execute(&call.name, arguments, ctx.as_ref()).await {
                Ok(output) => (
                    ToolCallResult {
                        content: vec![ToolContent::Text {
                            text: output.into_text(),
                        }],
                        is_error: false,
                    },
                    None,
                ),
                Err(err) => (
                    ToolCallResult {
                        content: vec![ToolContent::Text {
                            text: err.to_string(),
                        }],
                        is_error: true,
                    },
                    Some(err.kind()),
                ),
            };
        Handled {
            response: Some(to_response(id, &result)),
            method: McpMethod::ToolsCall,
            tool: Some(call.name),
            error_kind,
        }
    }

    /// Projects the visible tools to wire definitions.
    fn definitions(&self, ctx: Option<&AuthContext>) -> Vec<ToolDefinition> {
        self.dispatcher.available_tools(ctx).into_iter().map(|tool| tool.definition()).collect()
    }

    /// Records audit and metric events for a handled message.
    fn observe(
        &self,
        transport: ServerTransport,
        request_id: Option<String>,
        request_bytes: usize,
        handled: &Handled,
        started: Instant,
    ) {
        let response_bytes = handled
            .response
            .as_ref()
            .and_then(|response| serde_json::to_vec(response).ok())
            .map_or(0, |bytes| bytes.len());
        let error_code = handled.response.as_ref().and_then(JsonRpcResponse::error_code);
        let outcome = if handled.error_kind.is_some() || error_code.is_some() {
            McpOutcome::Error
        } else {
            McpOutcome::Ok
        };
        self.audit.record(&McpAuditEvent::new(McpAuditEventParams {
            request_id,
            transport,
            method: handled.method,
            tool: handled.tool.clone(),
            outcome,
            error_code,
            error_kind: handled.error_kind,
            request_bytes,
            response_bytes,
        }));
        let event = McpMetricEvent {
            transport,
            method: handled.method,
            tool: handled.tool.clone(),
            outcome,
            error_code,
            error_kind: handled.error_kind,
            request_bytes,
            response_bytes,
        };
        self.metrics.record_request(event.clone());
        self.metrics.record_latency(event, started.elapsed());
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses the JSON-RPC envelope or produces the error response.
fn parse_request(bytes: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| {
        JsonRpcResponse::failure(Value::Null, INVALID_REQUEST, "invalid json-rpc request")
    })?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let mut request: JsonRpcRequest = serde_json::from_value(value.clone())
        .map_err(|_| JsonRpcResponse::failure(id, INVALID_REQUEST, "invalid json-rpc request"))?;
    // An explicit `"id": null` is a request, not a notification.
    if request.id.is_none() && value.get("id").is_some() {
        request.id = Some(Value::Null);
    }
    Ok(request)
}

/// Renders a request id for audit logs.
fn render_id(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Serializes a result into a success response.
fn to_response<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(_) => JsonRpcResponse::failure(id, INTERNAL_ERROR, "result serialization failed"),
    }
}

/// Builds the `initialize` result.
fn initialize_result(params: Option<&Value>) -> Value {
    let requested = params.and_then(|params| params.get("protocolVersion")).and_then(Value::as_str);
    let version = requested
        .filter(|version| SUPPORTED_PROTOCOL_VERSIONS.contains(version))
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}
