// crates/switchboard-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared mocks and catalogs for core integration tests.
// Purpose: Provide counting handlers and scripted identity collaborators.
// Dependencies: switchboard-core
// ============================================================================

//! ## Overview
//! Fixtures mirror a small deployment: a public session domain, a CRM domain
//! gated by `view_crm` / `manage_crm`, and an events domain gated by
//! `manage_events`. Every handler counts its invocations so tests can assert
//! that rejected calls never reach business logic.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use switchboard_core::AuthContext;
use switchboard_core::Catalog;
use switchboard_core::CredentialStore;
use switchboard_core::CredentialStoreError;
use switchboard_core::HandlerError;
use switchboard_core::IdentityAuthority;
use switchboard_core::IdentityAuthorityError;
use switchboard_core::IdentityValidation;
use switchboard_core::PermissionSet;
use switchboard_core::Session;
use switchboard_core::ToolDescriptor;
use switchboard_core::ToolDomain;
use switchboard_core::ToolHandler;
use switchboard_core::ToolOutput;

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handler that records every call and returns its arguments.
#[derive(Default)]
pub struct CountingHandler {
    calls: AtomicUsize,
}

impl CountingHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolHandler for CountingHandler {
    async fn call(
        &self,
        args: Value,
        _ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutput::Json(args))
    }
}

/// Handler failing with a fixed message.
pub struct FailingHandler(pub &'static str);

#[async_trait]
impl ToolHandler for FailingHandler {
    async fn call(
        &self,
        _args: Value,
        _ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        Err(self.0.into())
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Sample catalog with one shared counting handler.
pub fn sample_catalog(handler: &Arc<CountingHandler>) -> Catalog {
    let h = || -> Arc<dyn ToolHandler> { handler.clone() };
    Catalog::new(vec![
        ToolDomain::new(
            "session",
            "Session tools",
            vec![
                ToolDescriptor::builder("list_capabilities", h()).requires_auth(false).build(),
                ToolDescriptor::builder("login_instructions", h()).requires_auth(false).build(),
                ToolDescriptor::builder("whoami", h()).build(),
            ],
        ),
        ToolDomain::new(
            "crm",
            "CRM tools",
            vec![
                ToolDescriptor::builder("crm_list_contacts", h()).permission("view_crm").build(),
                ToolDescriptor::builder("crm_create_contact", h()).permission("manage_crm").build(),
                ToolDescriptor::builder("crm_merge_contacts", h())
                    .permissions(["view_crm", "manage_crm"])
                    .build(),
            ],
        ),
        ToolDomain::new(
            "events",
            "Event tools",
            vec![
                ToolDescriptor::builder("events_create", h()).permission("manage_events").build(),
                ToolDescriptor::builder("events_fail", Arc::new(FailingHandler("boom"))).build(),
            ],
        ),
    ])
    .expect("sample catalog")
}

/// Builds a context holding the given grants.
pub fn context(grants: &[&str]) -> AuthContext {
    AuthContext::new(
        Some("user-1".to_string()),
        Some("org-1".to_string()),
        Some("Acme".to_string()),
        Some("user@example.com".to_string()),
        "session-token".to_string(),
        PermissionSet::from_grants(grants.iter().copied()),
    )
}

// ============================================================================
// SECTION: Identity Collaborators
// ============================================================================

/// In-memory credential store.
#[derive(Default)]
pub struct MemoryStore {
    session: Mutex<Option<Session>>,
}

impl MemoryStore {
    pub fn holding(session: Session) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(Some(session)),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl CredentialStore for MemoryStore {
    fn read_session(&self) -> Result<Option<Session>, CredentialStoreError> {
        Ok(self.session.lock().unwrap().clone())
    }

    fn write_session(&self, session: &Session) -> Result<(), CredentialStoreError> {
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), CredentialStoreError> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }
}

/// Identity authority with a scripted answer.
pub enum ScriptedAuthority {
    /// Answers with the given validation.
    Answer(IdentityValidation),
    /// Fails as if the network were down.
    Unreachable,
}

impl ScriptedAuthority {
    /// Valid answer carrying the given grants.
    pub fn granting(grants: &[&str]) -> Arc<Self> {
        Arc::new(Self::Answer(IdentityValidation {
            valid: true,
            permissions: Some(grants.iter().map(ToString::to_string).collect()),
            ..IdentityValidation::default()
        }))
    }
}

#[async_trait]
impl IdentityAuthority for ScriptedAuthority {
    async fn validate(&self, _token: &str) -> Result<IdentityValidation, IdentityAuthorityError> {
        match self {
            Self::Answer(validation) => Ok(validation.clone()),
            Self::Unreachable => Err(IdentityAuthorityError::Unavailable("connection refused".to_string())),
        }
    }
}

/// Session with cached identity fields and no cached grants.
pub fn logged_in_session() -> Session {
    let mut session = Session::new("session-token");
    session.user_id = Some("user-1".to_string());
    session.organization_id = Some("org-1".to_string());
    session.organization_name = Some("Acme".to_string());
    session
}
