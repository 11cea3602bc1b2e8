// crates/switchboard-core/src/lib.rs
// ============================================================================
// Module: Switchboard Core Library
// Description: Public API surface for the Switchboard dispatch core.
// Purpose: Expose identity, catalog, capability, and dispatch primitives.
// Dependencies: crate::{permissions, identity, interfaces, catalog, capability, dispatch, resolver}
// ============================================================================

//! ## Overview
//! Switchboard core decides which tools a caller may see and invoke. It
//! resolves a persisted session into an [`AuthContext`], filters a static
//! [`Catalog`] down to the visible tools, and dispatches invocations after
//! re-checking authentication and permissions. The core performs no I/O of its
//! own; credential storage, identity validation, and tool business logic are
//! supplied through the [`interfaces`] traits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod capability;
pub mod catalog;
pub mod dispatch;
pub mod identity;
pub mod interfaces;
pub mod permissions;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capability::available_tools;
pub use capability::is_permitted;
pub use capability::tool_visible;
pub use catalog::Catalog;
pub use catalog::CatalogError;
pub use catalog::ToolDefinition;
pub use catalog::ToolDescriptor;
pub use catalog::ToolDescriptorBuilder;
pub use catalog::ToolDomain;
pub use dispatch::DispatchError;
pub use dispatch::Dispatcher;
pub use identity::AuthContext;
pub use identity::IdentityValidation;
pub use identity::Session;
pub use interfaces::CredentialStore;
pub use interfaces::CredentialStoreError;
pub use interfaces::FnHandler;
pub use interfaces::HandlerError;
pub use interfaces::IdentityAuthority;
pub use interfaces::IdentityAuthorityError;
pub use interfaces::SessionSnapshot;
pub use interfaces::ToolHandler;
pub use interfaces::ToolOutput;
pub use interfaces::handler_fn;
pub use permissions::Permission;
pub use permissions::PermissionSet;
pub use permissions::WILDCARD_GRANT;
pub use resolver::AuthContextResolver;
pub use resolver::Resolution;
pub use resolver::ResolutionOutcome;
