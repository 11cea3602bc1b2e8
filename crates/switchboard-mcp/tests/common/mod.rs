// crates/switchboard-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: In-process upstream mock and config helpers for MCP tests.
// Purpose: Exercise the server against real HTTP identity and backend calls.
// Dependencies: axum, switchboard-config, switchboard-mcp, tempfile, tokio
// ============================================================================

//! ## Overview
//! One axum app plays both upstreams: the identity authority at
//! `/v1/auth/validate` and a small CRM backend. The active organization is
//! server-side state, so switching organizations changes what the next
//! validation reports.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Json;
use axum::Router;
use axum::extract::Path as UrlPath;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use switchboard_config::SwitchboardConfig;
use switchboard_core::CredentialStore;
use switchboard_core::Session;
use switchboard_mcp::FileCredentialStore;
use switchboard_mcp::McpServer;
use switchboard_mcp::RequestRouter;
use tempfile::TempDir;

// ============================================================================
// SECTION: Upstream Mock
// ============================================================================

/// Token the identity mock accepts.
pub const GOOD_TOKEN: &str = "good-token";

/// Server-side state shared by the mock routes.
struct UpstreamState {
    active_org: Mutex<String>,
}

fn org_profile(org: &str) -> (&'static str, Vec<&'static str>) {
    match org {
        "org-2" => ("Globex", vec!["view_crm", "manage_crm"]),
        _ => ("Acme", vec!["view_crm"]),
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn validate(State(state): State<Arc<UpstreamState>>, headers: HeaderMap) -> Response {
    if bearer(&headers).as_deref() != Some(GOOD_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let org = state.active_org.lock().unwrap().clone();
    let (name, permissions) = org_profile(&org);
    Json(json!({
        "valid": true,
        "userId": "user-1",
        "email": "ada@example.com",
        "organizationId": org,
        "organizationName": name,
        "permissions": permissions,
    }))
    .into_response()
}

async fn list_contacts(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    Json(json!({
        "contacts": [{"id": "c-1", "name": "Ada"}],
        "search": query.get("search"),
        "authorization": bearer(&headers),
    }))
}

async fn create_contact(Json(body): Json<Value>) -> Response {
    (StatusCode::CREATED, Json(json!({"created": body}))).into_response()
}

async fn get_contact(UrlPath(contact_id): UrlPath<String>) -> Response {
    if contact_id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "contact not found"})))
            .into_response();
    }
    Json(json!({"id": contact_id})).into_response()
}

async fn organizations() -> Json<Value> {
    Json(json!({
        "organizations": [
            {"id": "org-1", "name": "Acme"},
            {"id": "org-2", "name": "Globex"},
        ]
    }))
}

async fn switch_org(State(state): State<Arc<UpstreamState>>, Json(body): Json<Value>) -> Response {
    let org = body["organizationId"].as_str().unwrap_or_default().to_string();
    if org != "org-1" && org != "org-2" {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "not a member"}))).into_response();
    }
    let (name, permissions) = org_profile(&org);
    state.active_org.lock().unwrap().clone_from(&org);
    Json(json!({
        "organizationId": org,
        "organizationName": name,
        "permissions": permissions,
    }))
    .into_response()
}

/// Spawns the upstream mock and returns its base URL.
pub async fn spawn_upstream() -> String {
    let state = Arc::new(UpstreamState {
        active_org: Mutex::new("org-1".to_string()),
    });
    let app = Router::new()
        .route("/v1/auth/validate", get(validate))
        .route("/v1/contacts", get(list_contacts).post(create_contact))
        .route("/v1/contacts/{contactId}", get(get_contact))
        .route("/v1/organizations", get(organizations))
        .route("/v1/organizations/switch", post(switch_org))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Server configuration plus the temp directory holding its session file.
pub struct Harness {
    pub dir: TempDir,
    pub config: SwitchboardConfig,
}

impl Harness {
    /// Builds a config pointing both upstreams at `base_url`.
    pub fn new(base_url: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let session_path = dir.path().join("session.json");
        let text = format!(
            r#"
[server]
transport = "stdio"

[server.audit]
enabled = false

[session]
path = "{session}"

[identity]
base_url = "{base_url}"

[backend]
base_url = "{base_url}"

[[domains]]
name = "crm"
description = "CRM tools"

[[domains.tools]]
name = "crm_list_contacts"
description = "List contacts"
required_permissions = ["view_crm"]
method = "GET"
path = "/v1/contacts"

[domains.tools.input_schema]
type = "object"

[domains.tools.input_schema.properties.search]
type = "string"

[[domains.tools]]
name = "crm_get_contact"
description = "Fetch one contact"
required_permissions = ["view_crm"]
method = "GET"
path = "/v1/contacts/{{contactId}}"

[domains.tools.input_schema]
type = "object"
required = ["contactId"]

[domains.tools.input_schema.properties.contactId]
type = "string"

[[domains.tools]]
name = "crm_create_contact"
description = "Create a contact"
required_permissions = ["view_crm", "manage_crm"]
method = "POST"
path = "/v1/contacts"

[domains.tools.input_schema]
type = "object"

[domains.tools.input_schema.properties.name]
type = "string"
"#,
            session = session_path.display(),
        );
        let config = SwitchboardConfig::parse(&text).unwrap();
        Self {
            dir,
            config,
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.path().join("session.json")
    }

    /// Stores a session for `token` as `switchboard login` would.
    pub fn sign_in(&self, token: &str) {
        store_at(&self.session_path()).write_session(&Session::new(token)).unwrap();
    }

    pub fn sign_out(&self) {
        store_at(&self.session_path()).clear_session().unwrap();
    }

    pub fn stored_session(&self) -> Option<Session> {
        store_at(&self.session_path()).read_session().unwrap()
    }

    /// Builds the router exactly as `switchboard serve` does.
    pub fn router(&self) -> RequestRouter {
        McpServer::from_config(self.config.clone()).unwrap().router().clone()
    }
}

fn store_at(path: &Path) -> FileCredentialStore {
    FileCredentialStore::new(path)
}

// ============================================================================
// SECTION: JSON-RPC Helpers
// ============================================================================

pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

pub fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    request(id, "tools/call", json!({"name": name, "arguments": arguments}))
}

/// Extracts tool names from a `tools/list` response.
pub fn tool_names(response: &Value) -> Vec<String> {
    response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap().to_string())
        .collect()
}

/// Returns `(is_error, text)` of a `tools/call` response.
pub fn call_text(response: &Value) -> (bool, String) {
    let result = &response["result"];
    let is_error = result["isError"].as_bool().unwrap();
    let text = result["content"][0]["text"].as_str().unwrap().to_string();
    (is_error, text)
}
