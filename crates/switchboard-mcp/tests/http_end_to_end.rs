// crates/switchboard-mcp/tests/http_end_to_end.rs
// ============================================================================
// Module: HTTP End-to-End Tests
// Description: Full request flows over the HTTP transport.
// Purpose: Validate discovery, forwarding, and organization switching against live upstreams.
// Dependencies: switchboard-mcp, reqwest, tokio
// ============================================================================

//! ## Overview
//! Each test boots the upstream mock, builds the server from a config file
//! the way `switchboard serve` does, and drives it through `POST /rpc`.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwraps for clarity."
)]

mod common;

use serde_json::Value;
use serde_json::json;
use switchboard_mcp::http_app;

use crate::common::GOOD_TOKEN;
use crate::common::Harness;
use crate::common::call_text;
use crate::common::request;
use crate::common::spawn_upstream;
use crate::common::tool_call;
use crate::common::tool_names;

/// Serves the harness router on a loopback port.
async fn serve(harness: &Harness) -> String {
    let app = http_app(harness.router(), harness.config.server.max_body_bytes);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/rpc")
}

async fn post(url: &str, body: &Value) -> Value {
    reqwest::Client::new().post(url).json(body).send().await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn anonymous_callers_only_see_public_session_tools() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream);
    let url = serve(&harness).await;

    let listed = post(&url, &request(1, "tools/list", json!({}))).await;
    assert_eq!(tool_names(&listed), vec!["list_capabilities", "login_instructions"]);

    let response = post(&url, &tool_call(2, "crm_list_contacts", json!({}))).await;
    let (is_error, text) = call_text(&response);
    assert!(is_error);
    assert!(text.contains("authentication required"), "{text}");
}

#[tokio::test]
async fn signed_in_callers_see_tools_their_grants_allow() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream);
    let url = serve(&harness).await;
    harness.sign_in(GOOD_TOKEN);

    let listed = post(&url, &request(1, "tools/list", json!({}))).await;
    assert_eq!(
        tool_names(&listed),
        vec![
            "list_capabilities",
            "login_instructions",
            "whoami",
            "list_organizations",
            "switch_organization",
            "crm_list_contacts",
            "crm_get_contact",
        ]
    );

    let response = post(&url, &tool_call(2, "crm_create_contact", json!({"name": "Ada"}))).await;
    let (is_error, text) = call_text(&response);
    assert!(is_error);
    assert_eq!(text, "permission denied: crm_create_contact requires manage_crm");
}

#[tokio::test]
async fn forwarding_tools_carry_the_session_token_and_arguments() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream);
    let url = serve(&harness).await;
    harness.sign_in(GOOD_TOKEN);

    let response =
        post(&url, &tool_call(1, "crm_list_contacts", json!({"search": "ada lovelace"}))).await;
    let (is_error, text) = call_text(&response);
    assert!(!is_error, "{text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["search"], json!("ada lovelace"));
    assert_eq!(body["authorization"], json!(GOOD_TOKEN));
    assert_eq!(body["contacts"][0]["id"], json!("c-1"));

    let response = post(&url, &tool_call(2, "crm_get_contact", json!({"contactId": "c-9"}))).await;
    let (_, text) = call_text(&response);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body, json!({"id": "c-9"}));
}

#[tokio::test]
async fn backend_errors_surface_as_tool_failures() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream);
    let url = serve(&harness).await;
    harness.sign_in(GOOD_TOKEN);

    let response =
        post(&url, &tool_call(1, "crm_get_contact", json!({"contactId": "missing"}))).await;
    let (is_error, text) = call_text(&response);
    assert!(is_error);
    assert!(text.starts_with("tool crm_get_contact failed:"), "{text}");
    assert!(text.contains("404"), "{text}");
    assert!(text.contains("contact not found"), "{text}");

    let response = post(&url, &tool_call(2, "crm_get_contact", json!({}))).await;
    let (is_error, text) = call_text(&response);
    assert!(is_error);
    assert!(text.contains("missing required argument `contactId`"), "{text}");
}

#[tokio::test]
async fn switching_organization_changes_the_next_discovery() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream);
    let url = serve(&harness).await;
    harness.sign_in(GOOD_TOKEN);

    let before = tool_names(&post(&url, &request(1, "tools/list", json!({}))).await);
    assert!(!before.contains(&"crm_create_contact".to_string()));

    let response =
        post(&url, &tool_call(2, "switch_organization", json!({"organizationId": "org-2"}))).await;
    let (is_error, text) = call_text(&response);
    assert!(!is_error, "{text}");
    let stored = harness.stored_session().unwrap();
    assert_eq!(stored.organization_id.as_deref(), Some("org-2"));
    assert_eq!(stored.organization_name.as_deref(), Some("Globex"));
    assert_eq!(stored.token, GOOD_TOKEN);

    let after = tool_names(&post(&url, &request(3, "tools/list", json!({}))).await);
    assert!(after.contains(&"crm_create_contact".to_string()));

    let response = post(&url, &tool_call(4, "crm_create_contact", json!({"name": "Ada"}))).await;
    let (is_error, text) = call_text(&response);
    assert!(!is_error, "{text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body, json!({"created": {"name": "Ada"}}));

    let whoami = post(&url, &tool_call(5, "whoami", json!({}))).await;
    let (_, text) = call_text(&whoami);
    assert!(text.contains("org-2"), "{text}");
}

#[tokio::test]
async fn signing_out_hides_private_tools_again() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream);
    let url = serve(&harness).await;
    harness.sign_in(GOOD_TOKEN);
    assert_eq!(tool_names(&post(&url, &request(1, "tools/list", json!({}))).await).len(), 7);

    harness.sign_out();
    assert_eq!(tool_names(&post(&url, &request(2, "tools/list", json!({}))).await).len(), 2);
}

#[tokio::test]
async fn rejected_tokens_are_treated_as_anonymous() {
    let upstream = spawn_upstream().await;
    let harness = Harness::new(&upstream);
    let url = serve(&harness).await;
    harness.sign_in("revoked-token");

    let listed = post(&url, &request(1, "tools/list", json!({}))).await;
    assert_eq!(tool_names(&listed), vec!["list_capabilities", "login_instructions"]);

    let capabilities = post(&url, &tool_call(2, "list_capabilities", json!({}))).await;
    let (is_error, text) = call_text(&capabilities);
    assert!(!is_error);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["authenticated"], json!(false));
    assert!(!text.contains("revoked-token"));
}
