// crates/switchboard-core/src/dispatch/tests.rs
// ============================================================================
// Module: Dispatcher Unit Tests
// Description: Unit tests for guarded tool execution.
// Purpose: Validate check ordering, error mapping, and error source retention.
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Unit tests use expect and panic for setup clarity."
)]

use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde_json::Value;
use serde_json::json;

use super::DispatchError;
use super::Dispatcher;
use crate::catalog::Catalog;
use crate::catalog::ToolDescriptor;
use crate::catalog::ToolDomain;
use crate::identity::AuthContext;
use crate::interfaces::HandlerError;
use crate::interfaces::ToolHandler;
use crate::interfaces::ToolOutput;
use crate::permissions::Permission;
use crate::permissions::PermissionSet;

/// Handler that counts its invocations and echoes its arguments.
struct Counting {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ToolHandler for Counting {
    async fn call(
        &self,
        args: Value,
        _ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutput::Json(args))
    }
}

/// Handler that always fails with a fixed message.
struct Failing;

#[async_trait::async_trait]
impl ToolHandler for Failing {
    async fn call(
        &self,
        _args: Value,
        _ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        Err("boom".into())
    }
}

/// Handler that panics mid-call.
struct Panicking;

#[async_trait::async_trait]
impl ToolHandler for Panicking {
    async fn call(
        &self,
        _args: Value,
        _ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        panic!("ledger offline")
    }
}

fn ctx(grants: &[&str]) -> AuthContext {
    AuthContext::new(
        Some("user-1".to_string()),
        Some("org-1".to_string()),
        Some("Acme".to_string()),
        None,
        "token".to_string(),
        PermissionSet::from_grants(grants.iter().copied()),
    )
}

fn fixture() -> (Dispatcher, Arc<Counting>) {
    let counting = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let handler: Arc<dyn ToolHandler> = counting.clone();
    let domain = ToolDomain::new(
        "crm",
        "CRM tools",
        vec![
            ToolDescriptor::builder("echo_public", Arc::clone(&handler)).requires_auth(false).build(),
            ToolDescriptor::builder("echo_private", Arc::clone(&handler)).build(),
            ToolDescriptor::builder("create_contact", Arc::clone(&handler))
                .permissions(["view_crm", "manage_crm"])
                .build(),
            ToolDescriptor::builder("explode", Arc::new(Failing)).build(),
        ],
    );
    let catalog = Catalog::new(vec![domain]).expect("catalog");
    (Dispatcher::new(Arc::new(catalog)), counting)
}

#[tokio::test]
async fn unknown_tool_is_rejected_with_its_name() {
    let (dispatcher, counting) = fixture();
    let err = dispatcher.execute("not_a_real_tool", json!({}), None).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownTool { .. }));
    assert!(err.to_string().contains("not_a_real_tool"));
    assert_eq!(err.kind(), "unknown_tool");
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_tool_wins_over_missing_auth() {
    let (dispatcher, _) = fixture();
    let err = dispatcher.execute("missing", json!({}), Some(&ctx(&[]))).await.unwrap_err();
    assert_eq!(err.kind(), "unknown_tool");
}

#[tokio::test]
async fn public_tool_runs_without_context() {
    let (dispatcher, counting) = fixture();
    let output = dispatcher.execute("echo_public", json!({"a": 1}), None).await.unwrap();
    assert_eq!(output, ToolOutput::Json(json!({"a": 1})));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn private_tool_requires_context() {
    let (dispatcher, counting) = fixture();
    let err = dispatcher.execute("echo_private", json!({}), None).await.unwrap_err();
    assert!(matches!(err, DispatchError::AuthenticationRequired { .. }));
    assert_eq!(err.tool(), "echo_private");
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn first_missing_permission_is_reported() {
    let (dispatcher, counting) = fixture();
    let err =
        dispatcher.execute("create_contact", json!({}), Some(&ctx(&["view_crm"]))).await.unwrap_err();
    match err {
        DispatchError::PermissionDenied {
            permission,
            tool,
        } => {
            assert_eq!(permission, Permission::new("manage_crm"));
            assert_eq!(tool, "create_contact");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unrestricted_caller_runs_any_tool() {
    let (dispatcher, counting) = fixture();
    dispatcher.execute("create_contact", json!({}), Some(&ctx(&["*"]))).await.unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_failure_keeps_the_original_error() {
    let (dispatcher, _) = fixture();
    let err = dispatcher.execute("explode", json!({}), Some(&ctx(&[]))).await.unwrap_err();
    assert_eq!(err.kind(), "handler_failure");
    assert!(err.to_string().contains("boom"));
    let source = err.source().expect("source");
    assert_eq!(source.to_string(), "boom");
    assert_eq!(err.handler_error().map(ToString::to_string), Some("boom".to_string()));
}

#[test]
fn available_tools_follow_context() {
    let (dispatcher, _) = fixture();
    let anonymous: Vec<&str> =
        dispatcher.available_tools(None).into_iter().map(ToolDescriptor::name).collect();
    assert_eq!(anonymous, vec!["echo_public"]);
    let viewer: Vec<&str> = dispatcher
        .available_tools(Some(&ctx(&["view_crm"])))
        .into_iter()
        .map(ToolDescriptor::name)
        .collect();
    assert_eq!(viewer, vec!["echo_public", "echo_private", "explode"]);
}

#[tokio::test]
async fn panicking_handler_becomes_a_handler_failure() {
    let domain = ToolDomain::new(
        "ops",
        "Ops tools",
        vec![ToolDescriptor::builder("crash", Arc::new(Panicking)).requires_auth(false).build()],
    );
    let dispatcher = Dispatcher::new(Arc::new(Catalog::new(vec![domain]).expect("catalog")));
    let err = dispatcher.execute("crash", json!({}), None).await.unwrap_err();
    assert_eq!(err.kind(), "handler_failure");
    assert_eq!(err.to_string(), "tool crash failed: handler panicked: ledger offline");
    assert!(err.source().is_some());

    let again = dispatcher.execute("crash", json!({}), None).await.unwrap_err();
    assert!(matches!(again, DispatchError::HandlerFailure { .. }));
}
