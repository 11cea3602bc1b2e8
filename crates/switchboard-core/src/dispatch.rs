// crates/switchboard-core/src/dispatch.rs
// ============================================================================
// Module: Switchboard Dispatcher
// Description: Tool lookup and guarded execution.
// Purpose: Re-check access at invocation time and normalize handler failures.
// Dependencies: crate::{catalog, capability, identity, interfaces}, futures, thiserror
// ============================================================================

//! ## Overview
//! The dispatcher resolves a tool by name and runs it only after the caller
//! passes the same checks discovery applies. Discovery results are never
//! trusted: a client may call a tool it was not shown.
//!
//! ## Invariants
//! - Check order is fixed: lookup, authentication, each required permission,
//!   then the handler. No handler runs for a rejected call.
//! - Handler errors are wrapped, never dropped; the original error stays
//!   reachable through [`std::error::Error::source`].
//! - A panicking handler becomes [`DispatchError::HandlerFailure`] so every
//!   invocation ends in a normal response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;

use crate::capability;
use crate::catalog::Catalog;
use crate::catalog::ToolDescriptor;
use crate::identity::AuthContext;
use crate::interfaces::HandlerError;
use crate::interfaces::ToolOutput;
use crate::permissions::Permission;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool invocation failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No tool has this name.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },
    /// The tool requires a session and none resolved.
    #[error("authentication required to call {tool}; run `switchboard login`")]
    AuthenticationRequired {
        /// Tool name.
        tool: String,
    },
    /// The caller lacks a required permission.
    #[error("permission denied: {tool} requires {permission}")]
    PermissionDenied {
        /// First missing permission.
        permission: Permission,
        /// Tool name.
        tool: String,
    },
    /// The handler ran and failed.
    #[error("tool {tool} failed: {source}")]
    HandlerFailure {
        /// Tool name.
        tool: String,
        /// Original handler error.
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// Returns a stable label for audit and telemetry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool {
                ..
            } => "unknown_tool",
            Self::AuthenticationRequired {
                ..
            } => "authentication_required",
            Self::PermissionDenied {
                ..
            } => "permission_denied",
            Self::HandlerFailure {
                ..
            } => "handler_failure",
        }
    }

    /// Returns the tool name involved in the failure.
    #[must_use]
    pub fn tool(&self) -> &str {
        match self {
            Self::UnknownTool {
                name,
            } => name,
            Self::AuthenticationRequired {
                tool,
            }
            | Self::PermissionDenied {
                tool, ..
            }
            | Self::HandlerFailure {
                tool, ..
            } => tool,
        }
    }

    /// Returns the original handler error for handler failures.
    #[must_use]
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::HandlerFailure {
                source, ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Looks up and executes tools from a shared catalog.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Catalog shared with discovery.
    catalog: Arc<Catalog>,
}

impl Dispatcher {
    /// Creates a dispatcher over a catalog.
    #[must_use]
    pub const fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
        }
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.catalog.lookup(name)
    }

    /// Returns the tools visible under `ctx`, in catalog order.
    #[must_use]
    pub fn available_tools(&self, ctx: Option<&AuthContext>) -> Vec<&ToolDescriptor> {
        capability::available_tools(&self.catalog, ctx)
    }

    /// Executes a tool after access checks.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the tool is unknown, the caller is not
    /// allowed to run it, or the handler fails.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, DispatchError> {
        let tool = self.lookup(name).ok_or_else(|| DispatchError::UnknownTool {
            name: name.to_string(),
        })?;
        authorize(tool, ctx)?;
        let outcome = AssertUnwindSafe(tool.handler().call(args, ctx)).catch_unwind().await;
        let result = outcome.unwrap_or_else(|payload| Err(panic_error(&*payload)));
        result.map_err(|source| DispatchError::HandlerFailure {
            tool: tool.name().to_string(),
            source,
        })
    }
}

/// Converts a handler panic payload into a handler error.
fn panic_error(payload: &(dyn Any + Send)) -> HandlerError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("handler panicked: {detail}").into(),
        None => "handler panicked".into(),
    }
}

/// Applies the authentication and permission checks for one tool.
fn authorize(tool: &ToolDescriptor, ctx: Option<&AuthContext>) -> Result<(), DispatchError> {
    if !tool.requires_auth() {
        return Ok(());
    }
    let Some(ctx) = ctx else {
        return Err(DispatchError::AuthenticationRequired {
            tool: tool.name().to_string(),
        });
    };
    if let Some(missing) = ctx.permissions().first_missing(tool.required_permissions()) {
        return Err(DispatchError::PermissionDenied {
            permission: missing.clone(),
            tool: tool.name().to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
