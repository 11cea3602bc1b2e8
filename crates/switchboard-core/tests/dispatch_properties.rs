// crates/switchboard-core/tests/dispatch_properties.rs
// ============================================================================
// Module: Dispatch Property Tests
// Description: Visibility and invocation guarantees over a sample catalog.
// Purpose: Ensure discovery and dispatch agree and fail closed.
// Dependencies: switchboard-core
// ============================================================================

//! ## Overview
//! Checks the discovery rule against every tool and grant combination in the
//! sample catalog, and the dispatch guarantees for rejected calls.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures use unwraps for clarity."
)]

mod common;

use std::error::Error as _;
use std::sync::Arc;

use serde_json::json;
use switchboard_core::DispatchError;
use switchboard_core::Dispatcher;
use switchboard_core::ToolDescriptor;
use switchboard_core::available_tools;

use crate::common::CountingHandler;
use crate::common::context;
use crate::common::sample_catalog;

fn names(tools: &[&ToolDescriptor]) -> Vec<String> {
    tools.iter().map(|tool| tool.name().to_string()).collect()
}

#[test]
fn public_tools_are_visible_to_everyone() {
    let handler = Arc::new(CountingHandler::default());
    let catalog = sample_catalog(&handler);
    let contexts = [None, Some(context(&[])), Some(context(&["view_crm"])), Some(context(&["*"]))];
    for ctx in &contexts {
        let visible = names(&available_tools(&catalog, ctx.as_ref()));
        for tool in catalog.tools().filter(|tool| !tool.requires_auth()) {
            assert!(visible.contains(&tool.name().to_string()), "{} hidden", tool.name());
        }
    }
}

#[test]
fn gated_tools_visible_exactly_when_all_permissions_held() {
    let handler = Arc::new(CountingHandler::default());
    let catalog = sample_catalog(&handler);
    let grant_sets: [&[&str]; 5] =
        [&[], &["view_crm"], &["manage_crm"], &["view_crm", "manage_crm"], &["*"]];
    for grants in grant_sets {
        let ctx = context(grants);
        let visible = names(&available_tools(&catalog, Some(&ctx)));
        for tool in catalog.tools().filter(|tool| !tool.required_permissions().is_empty()) {
            let expected = grants.contains(&"*")
                || tool
                    .required_permissions()
                    .iter()
                    .all(|permission| grants.iter().any(|grant| *grant == permission.as_str()));
            assert_eq!(
                visible.contains(&tool.name().to_string()),
                expected,
                "tool {} with grants {grants:?}",
                tool.name()
            );
        }
        let anonymous = names(&available_tools(&catalog, None));
        for tool in catalog.tools().filter(|tool| !tool.required_permissions().is_empty()) {
            assert!(!anonymous.contains(&tool.name().to_string()));
        }
    }
}

#[test]
fn discovery_is_order_deterministic() {
    let handler = Arc::new(CountingHandler::default());
    let catalog = sample_catalog(&handler);
    let ctx = context(&["view_crm", "manage_crm"]);
    let first = names(&available_tools(&catalog, Some(&ctx)));
    let second = names(&available_tools(&catalog, Some(&ctx)));
    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            "list_capabilities",
            "login_instructions",
            "whoami",
            "crm_list_contacts",
            "crm_create_contact",
            "crm_merge_contacts",
            "events_fail",
        ]
    );
}

#[tokio::test]
async fn anonymous_calls_to_private_tools_never_reach_handlers() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let private: Vec<String> = dispatcher
        .catalog()
        .tools()
        .filter(|tool| tool.requires_auth())
        .map(|tool| tool.name().to_string())
        .collect();
    for name in private {
        let err = dispatcher.execute(&name, json!({}), None).await.unwrap_err();
        assert!(matches!(err, DispatchError::AuthenticationRequired { .. }), "{name}");
    }
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn permission_denial_names_permission_and_tool() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let ctx = context(&["view_crm"]);
    let err = dispatcher.execute("crm_merge_contacts", json!({}), Some(&ctx)).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("manage_crm"), "{message}");
    assert!(message.contains("crm_merge_contacts"), "{message}");
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn unknown_tool_message_contains_the_name() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let ctx = context(&["*"]);
    let err = dispatcher.execute("not_a_real_tool", json!({}), Some(&ctx)).await.unwrap_err();
    assert!(err.to_string().contains("not_a_real_tool"));
}

#[tokio::test]
async fn handler_failure_names_tool_and_keeps_source() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let ctx = context(&[]);
    let err = dispatcher.execute("events_fail", json!({}), Some(&ctx)).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("events_fail"));
    assert!(message.contains("boom"));
    assert_eq!(err.source().map(ToString::to_string), Some("boom".to_string()));
}

#[tokio::test]
async fn permitted_call_reaches_handler_with_arguments() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let ctx = context(&["view_crm"]);
    let output = dispatcher
        .execute("crm_list_contacts", json!({"limit": 5}), Some(&ctx))
        .await
        .unwrap();
    assert_eq!(output.into_text(), "{\n  \"limit\": 5\n}");
    assert_eq!(handler.calls(), 1);
}
