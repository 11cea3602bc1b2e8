// crates/switchboard-core/src/capability.rs
// ============================================================================
// Module: Switchboard Capability Resolver
// Description: Visibility filter from a catalog and an optional auth context.
// Purpose: Compute the tool set a caller may discover.
// Dependencies: crate::{catalog, identity, permissions}
// ============================================================================

//! ## Overview
//! Discovery shows a tool when it is public, or when the caller is
//! authenticated and holds every required permission (or is unrestricted).
//! The same rule backs dispatch-time checks and the capability listing tool,
//! so the three surfaces cannot drift apart.
//!
//! ## Invariants
//! - Pure function of its inputs.
//! - Filtering only removes entries; catalog order is preserved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::catalog::Catalog;
use crate::catalog::ToolDescriptor;
use crate::identity::AuthContext;
use crate::permissions::Permission;

// ============================================================================
// SECTION: Visibility Rule
// ============================================================================

/// Returns true when a tool with the given requirements is usable under `ctx`.
#[must_use]
pub fn is_permitted(
    requires_auth: bool,
    required: &[Permission],
    ctx: Option<&AuthContext>,
) -> bool {
    if !requires_auth {
        return true;
    }
    ctx.is_some_and(|ctx| ctx.permissions().allows_all(required))
}

/// Returns true when the tool is visible under `ctx`.
#[must_use]
pub fn tool_visible(tool: &ToolDescriptor, ctx: Option<&AuthContext>) -> bool {
    is_permitted(tool.requires_auth(), tool.required_permissions(), ctx)
}

/// Returns the tools visible under `ctx`, in catalog order.
#[must_use]
pub fn available_tools<'a>(
    catalog: &'a Catalog,
    ctx: Option<&AuthContext>,
) -> Vec<&'a ToolDescriptor> {
    catalog.tools().filter(|tool| tool_visible(tool, ctx)).collect()
}
