// crates/switchboard-core/src/catalog.rs
// ============================================================================
// Module: Switchboard Tool Catalog
// Description: Tool descriptors, domains, and the validated catalog.
// Purpose: Hold the static tool surface as an explicit, injectable value.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ToolDescriptor`] pairs a tool's public contract (name, description,
//! input schema) with its access requirements and handler. Descriptors are
//! grouped into [`ToolDomain`]s, and the ordered domains form a [`Catalog`].
//! The catalog is assembled once at startup and shared by reference; there is
//! no process-wide registry.
//!
//! ## Invariants
//! - Tool names are unique across the whole catalog (checked at construction).
//! - A tool that does not require authentication declares no permissions.
//! - Catalog order (domain order, then tool order) is preserved everywhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::interfaces::ToolHandler;
use crate::permissions::Permission;

// ============================================================================
// SECTION: Tool Definition
// ============================================================================

/// Public projection of a tool, safe to expose over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    pub input_schema: Value,
}

// ============================================================================
// SECTION: Tool Descriptor
// ============================================================================

/// One invokable operation.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Globally unique tool name.
    name: String,
    /// Human-readable description.
    description: String,
    /// JSON schema describing the arguments.
    input_schema: Value,
    /// Whether an authenticated caller is required.
    requires_auth: bool,
    /// Permissions required, in declaration order.
    required_permissions: Vec<Permission>,
    /// Business logic.
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Starts building a descriptor. Tools require authentication by default.
    #[must_use]
    pub fn builder(name: impl Into<String>, handler: Arc<dyn ToolHandler>) -> ToolDescriptorBuilder {
        ToolDescriptorBuilder {
            name: name.into(),
            description: String::new(),
            input_schema: empty_object_schema(),
            requires_auth: true,
            required_permissions: Vec::new(),
            handler,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns whether the tool requires an authenticated caller.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// Returns the required permissions in declaration order.
    #[must_use]
    pub fn required_permissions(&self) -> &[Permission] {
        &self.required_permissions
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Projects the descriptor to its wire definition.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("requires_auth", &self.requires_auth)
            .field("required_permissions", &self.required_permissions)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ToolDescriptor`].
pub struct ToolDescriptorBuilder {
    /// Tool name.
    name: String,
    /// Tool description.
    description: String,
    /// Input schema.
    input_schema: Value,
    /// Authentication requirement.
    requires_auth: bool,
    /// Required permissions.
    required_permissions: Vec<Permission>,
    /// Business logic.
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptorBuilder {
    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Sets whether authentication is required.
    #[must_use]
    pub const fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Adds a required permission.
    #[must_use]
    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        let permission = permission.into();
        if !self.required_permissions.contains(&permission) {
            self.required_permissions.push(permission);
        }
        self
    }

    /// Adds several required permissions.
    #[must_use]
    pub fn permissions<I, P>(self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        permissions.into_iter().fold(self, |builder, permission| builder.permission(permission))
    }

    /// Finishes the descriptor. Consistency is checked by [`Catalog::new`].
    #[must_use]
    pub fn build(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            requires_auth: self.requires_auth,
            required_permissions: self.required_permissions,
            handler: self.handler,
        }
    }
}

/// Schema for tools that take no arguments.
fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {}, "additionalProperties": false })
}

// ============================================================================
// SECTION: Tool Domain
// ============================================================================

/// Named, purely organizational grouping of tools.
#[derive(Debug, Clone)]
pub struct ToolDomain {
    /// Domain name.
    name: String,
    /// Domain description.
    description: String,
    /// Tools in declaration order.
    tools: Vec<ToolDescriptor>,
}

impl ToolDomain {
    /// Creates a domain.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        tools: Vec<ToolDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tools,
        }
    }

    /// Returns the domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the domain description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the tools in declaration order.
    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Catalog construction failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A tool has an empty name.
    #[error("domain {domain} contains a tool with an empty name")]
    EmptyToolName {
        /// Domain holding the tool.
        domain: String,
    },
    /// Two tools share a name.
    #[error("duplicate tool name {name} (domains {first_domain} and {second_domain})")]
    DuplicateTool {
        /// Shared tool name.
        name: String,
        /// Domain of the first registration.
        first_domain: String,
        /// Domain of the conflicting registration.
        second_domain: String,
    },
    /// A public tool declares permissions it could never enforce.
    #[error("tool {name} does not require auth but declares required permissions")]
    InconsistentDescriptor {
        /// Tool name.
        name: String,
    },
}

/// Validated, ordered tool catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Domains in catalog order.
    domains: Vec<ToolDomain>,
    /// Tool name to (domain index, tool index).
    index: BTreeMap<String, (usize, usize)>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate names and inconsistent descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on the first invalid descriptor.
    pub fn new(domains: Vec<ToolDomain>) -> Result<Self, CatalogError> {
        let mut index: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for (domain_idx, domain) in domains.iter().enumerate() {
            for (tool_idx, tool) in domain.tools.iter().enumerate() {
                if tool.name.trim().is_empty() {
                    return Err(CatalogError::EmptyToolName {
                        domain: domain.name.clone(),
                    });
                }
                if !tool.requires_auth && !tool.required_permissions.is_empty() {
                    return Err(CatalogError::InconsistentDescriptor {
                        name: tool.name.clone(),
                    });
                }
                if let Some((first_domain, _)) = index.get(&tool.name) {
                    return Err(CatalogError::DuplicateTool {
                        name: tool.name.clone(),
                        first_domain: domains[*first_domain].name.clone(),
                        second_domain: domain.name.clone(),
                    });
                }
                index.insert(tool.name.clone(), (domain_idx, tool_idx));
            }
        }
        Ok(Self {
            domains,
            index,
        })
    }

    /// Returns the domains in catalog order.
    #[must_use]
    pub fn domains(&self) -> &[ToolDomain] {
        &self.domains
    }

    /// Iterates every tool in catalog order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.domains.iter().flat_map(|domain| domain.tools.iter())
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        let (domain_idx, tool_idx) = self.index.get(name)?;
        self.domains.get(*domain_idx)?.tools.get(*tool_idx)
    }

    /// Returns the number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true when the catalog has no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
