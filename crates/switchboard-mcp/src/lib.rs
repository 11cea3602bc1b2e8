// crates/switchboard-mcp/src/lib.rs
// ============================================================================
// Module: Switchboard MCP
// Description: MCP protocol server and concrete collaborators for Switchboard.
// Purpose: Serve the auth-aware tool catalog over stdio and HTTP.
// Dependencies: switchboard-core, switchboard-config, axum, reqwest, tokio
// ============================================================================

//! ## Overview
//! Switchboard MCP wires the dispatch core in `switchboard-core` to the
//! outside world: the file-backed session store, the HTTP identity authority,
//! the backend client behind config-declared forwarding tools, the built-in
//! session tools, and the JSON-RPC transports. Every `tools/list` and
//! `tools/call` resolves the caller's auth context fresh.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod backend;
pub mod catalog;
pub mod credential_store;
pub mod forward;
pub mod identity;
pub mod router;
pub mod server;
pub mod session_tools;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuthResolutionEvent;
pub use audit::McpAuditEvent;
pub use audit::McpAuditSink;
pub use audit::McpFileAuditSink;
pub use audit::McpNoopAuditSink;
pub use audit::McpStderrAuditSink;
pub use backend::BackendClient;
pub use backend::BackendError;
pub use backend::BackendRequest;
pub use catalog::CatalogBuildError;
pub use catalog::CatalogHandle;
pub use catalog::build_catalog;
pub use credential_store::FileCredentialStore;
pub use forward::ForwardTool;
pub use forward::forwarding_domain;
pub use identity::HttpIdentityAuthority;
pub use router::JsonRpcResponse;
pub use router::PROTOCOL_VERSION;
pub use router::RequestRouter;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::http_app;
pub use server::serve_io;
pub use session_tools::session_domain;
pub use telemetry::McpMethod;
pub use telemetry::McpMetricEvent;
pub use telemetry::McpMetrics;
pub use telemetry::McpOutcome;
pub use telemetry::NoopMetrics;
