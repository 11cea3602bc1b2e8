// crates/switchboard-core/src/interfaces.rs
// ============================================================================
// Module: Switchboard Interfaces
// Description: Backend-agnostic seams for credentials, identity, and tool logic.
// Purpose: Define the contract surfaces the dispatch core consumes.
// Dependencies: async-trait, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The core never touches disks or networks. It consumes a [`CredentialStore`]
//! for the persisted session, an [`IdentityAuthority`] for live token
//! validation, and one [`ToolHandler`] per tool for business logic.
//! Implementations live in the MCP crate (or in tests).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::identity::AuthContext;
use crate::identity::IdentityValidation;
use crate::identity::Session;

// ============================================================================
// SECTION: Credential Store
// ============================================================================

/// Credential store failures.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The session file could not be read or written.
    #[error("credential store io error: {0}")]
    Io(String),
    /// The session file is not valid JSON or has the wrong shape.
    #[error("credential store parse error: {0}")]
    Parse(String),
    /// Another writer changed the session file since it was last read.
    #[error("credential store conflict: {0}")]
    Conflict(String),
}

/// A stored session together with the store revision it was read at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session present at read time.
    pub session: Option<Session>,
    /// Store revision at read time; 0 for stores without revisions.
    pub version: u64,
}

/// Persisted session storage.
///
/// Plain reads never affect later writes. Read-modify-write callers use
/// [`CredentialStore::read_for_update`] and hand the snapshot's version back
/// to [`CredentialStore::write_session_at`].
pub trait CredentialStore: Send + Sync {
    /// Reads the persisted session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store cannot be read.
    fn read_session(&self) -> Result<Option<Session>, CredentialStoreError>;

    /// Persists the session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store cannot be written.
    fn write_session(&self, session: &Session) -> Result<(), CredentialStoreError>;

    /// Removes the persisted session.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store cannot be written.
    fn clear_session(&self) -> Result<(), CredentialStoreError>;

    /// Reads the session along with the revision a later write must match.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the store cannot be read.
    fn read_for_update(&self) -> Result<SessionSnapshot, CredentialStoreError> {
        Ok(SessionSnapshot {
            session: self.read_session()?,
            version: 0,
        })
    }

    /// Persists the session only if the store is still at `expected_version`.
    ///
    /// Stores without revisions write unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError::Conflict`] when another writer moved the
    /// revision, or another [`CredentialStoreError`] when the write fails.
    fn write_session_at(
        &self,
        session: &Session,
        expected_version: u64,
    ) -> Result<(), CredentialStoreError> {
        let _ = expected_version;
        self.write_session(session)
    }
}

// ============================================================================
// SECTION: Identity Authority
// ============================================================================

/// Identity authority failures.
#[derive(Debug, Error)]
pub enum IdentityAuthorityError {
    /// The authority could not be reached or answered with a server error.
    #[error("identity authority unavailable: {0}")]
    Unavailable(String),
    /// The authority answered with an unparseable payload.
    #[error("identity authority response invalid: {0}")]
    InvalidResponse(String),
}

/// Remote validation of bearer tokens.
///
/// Calls are read-only and safe to repeat concurrently.
#[async_trait]
pub trait IdentityAuthority: Send + Sync {
    /// Validates a bearer token and returns the live identity.
    ///
    /// An explicitly rejected token is `Ok` with `valid == false`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityAuthorityError`] on network or server failures.
    async fn validate(&self, token: &str) -> Result<IdentityValidation, IdentityAuthorityError>;
}

// ============================================================================
// SECTION: Tool Handlers
// ============================================================================

/// Error raised by a tool handler. Preserved verbatim by the dispatcher.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Successful tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text, passed through unchanged.
    Text(String),
    /// Structured output, rendered as pretty JSON text.
    Json(Value),
}

impl ToolOutput {
    /// Builds a text output.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Builds a structured output from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the value cannot be serialized.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Renders the output as text. This is the only serialization applied to
    /// tool results before they reach the wire.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Business logic behind one tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Executes the tool with untrusted arguments.
    ///
    /// `ctx` is `None` only for tools that do not require authentication.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the underlying operation fails.
    async fn call(&self, args: Value, ctx: Option<&AuthContext>)
    -> Result<ToolOutput, HandlerError>;
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F> {
    /// Wrapped closure.
    func: F,
}

/// Wraps an async closure as a tool handler.
///
/// The closure receives an owned copy of the auth context.
pub const fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(Value, Option<AuthContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolOutput, HandlerError>> + Send + 'static,
{
    FnHandler {
        func,
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value, Option<AuthContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolOutput, HandlerError>> + Send + 'static,
{
    async fn call(
        &self,
        args: Value,
        ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        (self.func)(args, ctx.cloned()).await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
