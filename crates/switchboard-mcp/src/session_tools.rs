// crates/switchboard-mcp/src/session_tools.rs
// ============================================================================
// Module: Session Tools
// Description: Built-in tools for sign-in state and organization context.
// Purpose: Let agents discover capabilities and manage the active organization.
// Dependencies: serde_json, switchboard-config, switchboard-core
// ============================================================================

//! ## Overview
//! The `session` domain is always present. `list_capabilities` and
//! `login_instructions` work without a session; `whoami`,
//! `list_organizations`, and `switch_organization` require one.
//! `switch_organization` rewrites the persisted session so the next request
//! resolves against the new organization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use switchboard_config::HttpMethod;
use switchboard_config::RESERVED_DOMAIN_NAME;
use switchboard_core::AuthContext;
use switchboard_core::CredentialStore;
use switchboard_core::HandlerError;
use switchboard_core::Permission;
use switchboard_core::ToolDescriptor;
use switchboard_core::ToolDomain;
use switchboard_core::ToolHandler;
use switchboard_core::ToolOutput;
use switchboard_core::tool_visible;

use crate::backend::BackendClient;
use crate::backend::BackendRequest;
use crate::catalog::CatalogHandle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Backend endpoint listing the caller's organizations.
const ORGANIZATIONS_PATH: &str = "/v1/organizations";
/// Backend endpoint switching the active organization.
const SWITCH_ORGANIZATION_PATH: &str = "/v1/organizations/switch";

/// Text returned by `login_instructions`.
const LOGIN_INSTRUCTIONS: &str = "\
You are not signed in, so only public tools are available.

To sign in, run `switchboard login --token <TOKEN>` in a terminal using a token \
issued by your organization, then call `list_capabilities` again. The running \
server picks up the new session on the next request; no restart is needed.";

// ============================================================================
// SECTION: Domain
// ============================================================================

/// Builds the built-in `session` domain.
#[must_use]
pub fn session_domain(
    catalog: CatalogHandle,
    store: Arc<dyn CredentialStore>,
    backend: Arc<BackendClient>,
) -> ToolDomain {
    let tools = vec![
        ToolDescriptor::builder(
            "list_capabilities",
            Arc::new(ListCapabilities {
                catalog,
            }),
        )
        .description("Describe sign-in state and every tool, marking which ones you can use.")
        .requires_auth(false)
        .build(),
        ToolDescriptor::builder("login_instructions", Arc::new(LoginInstructions))
            .description("Explain how to sign in to unlock more tools.")
            .requires_auth(false)
            .build(),
        ToolDescriptor::builder("whoami", Arc::new(Whoami))
            .description("Show the signed-in user, active organization, and permissions.")
            .build(),
        ToolDescriptor::builder(
            "list_organizations",
            Arc::new(ListOrganizations {
                backend: Arc::clone(&backend),
            }),
        )
        .description("List the organizations you belong to.")
        .build(),
        ToolDescriptor::builder(
            "switch_organization",
            Arc::new(SwitchOrganization {
                backend,
                store,
            }),
        )
        .description("Switch the active organization for subsequent requests.")
        .input_schema(json!({
            "type": "object",
            "properties": {
                "organizationId": {
                    "type": "string",
                    "description": "Identifier of the organization to activate."
                }
            },
            "required": ["organizationId"],
            "additionalProperties": false
        }))
        .build(),
    ];
    ToolDomain::new(RESERVED_DOMAIN_NAME, "Sign-in state and organization context.", tools)
}

/// Returns the context or a handler error for tools that need one.
fn require_context(ctx: Option<&AuthContext>) -> Result<&AuthContext, HandlerError> {
    ctx.ok_or_else(|| "this tool requires a signed-in session".into())
}

// ============================================================================
// SECTION: Public Tools
// ============================================================================

/// `list_capabilities`: sign-in state plus the whole catalog with visibility.
struct ListCapabilities {
    /// Catalog this tool is registered in.
    catalog: CatalogHandle,
}

#[async_trait]
impl ToolHandler for ListCapabilities {
    async fn call(
        &self,
        _args: Value,
        ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        let catalog = self.catalog.get().ok_or("tool catalog is not available")?;
        let domains: Vec<Value> = catalog
            .domains()
            .iter()
            .map(|domain| {
                let tools: Vec<Value> = domain
                    .tools()
                    .iter()
                    .map(|tool| {
                        json!({
                            "name": tool.name(),
                            "description": tool.description(),
                            "requiresAuth": tool.requires_auth(),
                            "requiredPermissions": tool
                                .required_permissions()
                                .iter()
                                .map(Permission::as_str)
                                .collect::<Vec<_>>(),
                            "visible": tool_visible(tool, ctx),
                        })
                    })
                    .collect();
                json!({
                    "name": domain.name(),
                    "description": domain.description(),
                    "tools": tools,
                })
            })
            .collect();
        let summary = match ctx {
            Some(ctx) => json!({
                "authenticated": true,
                "userId": ctx.user_id(),
                "email": ctx.email(),
                "organizationId": ctx.organization_id(),
                "organizationName": ctx.organization_name(),
                "permissions": ctx.permissions().grants(),
                "domains": domains,
            }),
            None => json!({
                "authenticated": false,
                "hint": "Call login_instructions to learn how to sign in.",
                "domains": domains,
            }),
        };
        Ok(ToolOutput::Json(summary))
    }
}

/// `login_instructions`: static sign-in guidance.
struct LoginInstructions;

#[async_trait]
impl ToolHandler for LoginInstructions {
    async fn call(
        &self,
        _args: Value,
        _ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        Ok(ToolOutput::text(LOGIN_INSTRUCTIONS))
    }
}

// ============================================================================
// SECTION: Authenticated Tools
// ============================================================================

/// `whoami`: the resolved identity for this request.
struct Whoami;

#[async_trait]
impl ToolHandler for Whoami {
    async fn call(
        &self,
        _args: Value,
        ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        let ctx = require_context(ctx)?;
        Ok(ToolOutput::Json(json!({
            "userId": ctx.user_id(),
            "email": ctx.email(),
            "organizationId": ctx.organization_id(),
            "organizationName": ctx.organization_name(),
            "permissions": ctx.permissions().grants(),
        })))
    }
}

/// `list_organizations`: backend passthrough.
struct ListOrganizations {
    /// Backend client.
    backend: Arc<BackendClient>,
}

#[async_trait]
impl ToolHandler for ListOrganizations {
    async fn call(
        &self,
        _args: Value,
        ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        let ctx = require_context(ctx)?;
        let request = BackendRequest::new(HttpMethod::Get, ORGANIZATIONS_PATH);
        let organizations = self.backend.send(ctx.session_token(), request).await?;
        Ok(ToolOutput::Json(organizations))
    }
}

/// `switch_organization`: backend switch plus session file update.
struct SwitchOrganization {
    /// Backend client.
    backend: Arc<BackendClient>,
    /// Session persistence.
    store: Arc<dyn CredentialStore>,
}

#[async_trait]
impl ToolHandler for SwitchOrganization {
    async fn call(
        &self,
        args: Value,
        ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        let ctx = require_context(ctx)?;
        let organization_id = args
            .get("organizationId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or("organizationId must be a non-empty string")?
            .to_string();

        // Read before the remote call so a concurrent login is detected on write.
        let snapshot = self.store.read_for_update()?;
        let mut session = snapshot.session.ok_or("no stored session to update")?;
        let request = BackendRequest::new(HttpMethod::Post, SWITCH_ORGANIZATION_PATH)
            .with_body(json!({ "organizationId": organization_id }));
        let answer = self.backend.send(ctx.session_token(), request).await?;

        let text_field =
            |key: &str| answer.get(key).and_then(Value::as_str).map(str::to_string);
        session.organization_id = Some(text_field("organizationId").unwrap_or(organization_id));
        session.organization_name = text_field("organizationName");
        session.permissions = answer.get("permissions").and_then(|value| {
            value.as_array().map(|grants| {
                grants.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
        });
        if let Some(token) = text_field("token").filter(|token| !token.trim().is_empty()) {
            session.token = token;
        }
        self.store.write_session_at(&session, snapshot.version)?;

        Ok(ToolOutput::Json(json!({
            "organizationId": session.organization_id,
            "organizationName": session.organization_name,
            "message": "Organization switched. New permissions apply from the next request.",
        })))
    }
}
