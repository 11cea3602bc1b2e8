// crates/switchboard-core/tests/discovery_scenarios.rs
// ============================================================================
// Module: Discovery Scenario Tests
// Description: End-to-end resolution plus discovery over scripted identities.
// Purpose: Ensure discovery fails closed when identity cannot be established.
// Dependencies: switchboard-core
// ============================================================================

//! ## Overview
//! Each scenario resolves a context through [`AuthContextResolver`] with an
//! in-memory store and a scripted authority, then runs discovery and dispatch.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures use unwraps for clarity."
)]

mod common;

use std::sync::Arc;

use serde_json::json;
use switchboard_core::AuthContextResolver;
use switchboard_core::Dispatcher;
use switchboard_core::ResolutionOutcome;
use switchboard_core::Session;

use crate::common::CountingHandler;
use crate::common::MemoryStore;
use crate::common::ScriptedAuthority;
use crate::common::logged_in_session;
use crate::common::sample_catalog;

fn visible(dispatcher: &Dispatcher, ctx: Option<&switchboard_core::AuthContext>) -> Vec<String> {
    dispatcher.available_tools(ctx).iter().map(|tool| tool.name().to_string()).collect()
}

#[tokio::test]
async fn no_session_shows_only_public_tools() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let resolver = AuthContextResolver::new(MemoryStore::empty(), ScriptedAuthority::granting(&["*"]));
    let ctx = resolver.resolve().await;
    assert!(ctx.is_none());
    let tools = visible(&dispatcher, ctx.as_ref());
    assert_eq!(tools, vec!["list_capabilities", "login_instructions"]);
    assert!(tools.iter().all(|name| !name.starts_with("crm_") && !name.starts_with("events_")));
}

#[tokio::test]
async fn view_grant_shows_view_tools_only() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let resolver = AuthContextResolver::new(
        MemoryStore::holding(logged_in_session()),
        ScriptedAuthority::granting(&["view_crm"]),
    );
    let ctx = resolver.resolve().await.expect("context");
    let tools = visible(&dispatcher, Some(&ctx));
    assert!(tools.contains(&"crm_list_contacts".to_string()));
    assert!(!tools.contains(&"crm_create_contact".to_string()));
    assert!(!tools.contains(&"crm_merge_contacts".to_string()));
}

#[tokio::test]
async fn token_only_session_unlocks_granted_tools() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let resolver = AuthContextResolver::new(
        MemoryStore::holding(Session::new("session-token")),
        ScriptedAuthority::granting(&["view_crm"]),
    );
    let resolution = resolver.resolve_detailed(time::OffsetDateTime::now_utc()).await;
    assert_eq!(resolution.outcome, ResolutionOutcome::Resolved);
    let ctx = resolution.context.expect("context");
    assert_eq!(ctx.user_id(), None);
    let tools = visible(&dispatcher, Some(&ctx));
    assert!(tools.contains(&"crm_list_contacts".to_string()));
    assert!(!tools.contains(&"crm_create_contact".to_string()));
    dispatcher.execute("crm_list_contacts", json!({}), Some(&ctx)).await.unwrap();
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn unreachable_authority_matches_anonymous_discovery() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let resolver = AuthContextResolver::new(
        MemoryStore::holding(logged_in_session()),
        Arc::new(ScriptedAuthority::Unreachable),
    );
    let resolution = resolver.resolve_detailed(time::OffsetDateTime::now_utc()).await;
    assert_eq!(resolution.outcome, ResolutionOutcome::AuthorityUnavailable);
    assert_eq!(visible(&dispatcher, resolution.context.as_ref()), visible(&dispatcher, None));
}

#[tokio::test]
async fn wildcard_grant_unlocks_every_gated_tool() {
    let handler = Arc::new(CountingHandler::default());
    let dispatcher = Dispatcher::new(Arc::new(sample_catalog(&handler)));
    let resolver = AuthContextResolver::new(
        MemoryStore::holding(logged_in_session()),
        ScriptedAuthority::granting(&["*"]),
    );
    let ctx = resolver.resolve().await.expect("context");
    let all: Vec<String> =
        dispatcher.catalog().tools().map(|tool| tool.name().to_string()).collect();
    assert_eq!(visible(&dispatcher, Some(&ctx)), all);
    for name in ["crm_create_contact", "crm_merge_contacts", "events_create"] {
        dispatcher.execute(name, json!({}), Some(&ctx)).await.unwrap();
    }
    assert_eq!(handler.calls(), 3);
}
