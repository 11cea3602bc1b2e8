// crates/switchboard-mcp/src/forward.rs
// ============================================================================
// Module: Forwarding Tools
// Description: Config-declared tools that proxy arguments to the backend.
// Purpose: Turn `[[domains.tools]]` entries into catalog descriptors.
// Dependencies: serde_json, switchboard-config, switchboard-core
// ============================================================================

//! ## Overview
//! A forwarding tool fills `{field}` placeholders in its endpoint path from
//! the call arguments, sends the remaining arguments as the query string
//! (`GET`/`DELETE`) or JSON body (other methods), and returns the backend's
//! JSON response. Every call carries the caller's session token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use switchboard_config::ConfigError;
use switchboard_config::DomainConfig;
use switchboard_config::ForwardToolConfig;
use switchboard_config::HttpMethod;
use switchboard_config::path_placeholders;
use switchboard_core::AuthContext;
use switchboard_core::HandlerError;
use switchboard_core::ToolDescriptor;
use switchboard_core::ToolDomain;
use switchboard_core::ToolHandler;
use switchboard_core::ToolOutput;

use crate::backend::BackendClient;
use crate::backend::BackendRequest;

// ============================================================================
// SECTION: Path Templates
// ============================================================================

/// One piece of a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    /// Literal text.
    Literal(String),
    /// Argument placeholder.
    Field(String),
}

/// Parsed endpoint path: one entry per `/`-separated segment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathTemplate {
    /// Segment parts in order.
    segments: Vec<Vec<Part>>,
}

impl PathTemplate {
    /// Parses a validated endpoint path.
    fn parse(path: &str) -> Result<Self, ConfigError> {
        path_placeholders(path)?;
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(parse_segment)
            .collect();
        Ok(Self {
            segments,
        })
    }

    /// Returns the placeholder names in order.
    fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().flatten().filter_map(|part| match part {
            Part::Field(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Renders decoded segments, consuming the used arguments.
    fn render(&self, args: &mut Map<String, Value>) -> Result<Vec<String>, HandlerError> {
        let mut rendered = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let mut text = String::new();
            for part in segment {
                match part {
                    Part::Literal(literal) => text.push_str(literal),
                    Part::Field(name) => {
                        let value = args
                            .remove(name)
                            .filter(|value| !value.is_null())
                            .ok_or_else(|| format!("missing required argument `{name}`"))?;
                        let value = scalar_text(&value).ok_or_else(|| {
                            format!("argument `{name}` must be a string, number, or boolean")
                        })?;
                        if value.is_empty() {
                            return Err(format!("argument `{name}` must not be empty").into());
                        }
                        text.push_str(&value);
                    }
                }
            }
            rendered.push(text);
        }
        Ok(rendered)
    }
}

/// Splits one segment into literal and placeholder parts.
fn parse_segment(segment: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut rest = segment;
    while let Some(open) = rest.find('{') {
        if open > 0 {
            parts.push(Part::Literal(rest[.. open].to_string()));
        }
        let after = &rest[open + 1 ..];
        let Some(close) = after.find('}') else {
            parts.push(Part::Literal(rest[open ..].to_string()));
            return parts;
        };
        parts.push(Part::Field(after[.. close].trim().to_string()));
        rest = &after[close + 1 ..];
    }
    if !rest.is_empty() {
        parts.push(Part::Literal(rest.to_string()));
    }
    parts
}

/// Renders scalar JSON values as plain text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Tool handler forwarding one call to the backend.
pub struct ForwardTool {
    /// Backend client shared by all tools.
    backend: Arc<BackendClient>,
    /// HTTP method.
    method: HttpMethod,
    /// Endpoint path template.
    template: PathTemplate,
}

impl ForwardTool {
    /// Builds a handler for the configured tool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path template is malformed.
    pub fn new(config: &ForwardToolConfig, backend: Arc<BackendClient>) -> Result<Self, ConfigError> {
        Ok(Self {
            backend,
            method: config.method,
            template: PathTemplate::parse(&config.path)?,
        })
    }

    /// Returns the placeholder names in path order.
    #[must_use]
    pub fn path_fields(&self) -> Vec<&str> {
        self.template.fields().collect()
    }

    /// Builds the backend request for a set of arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the arguments are not an object or a
    /// placeholder cannot be filled.
    pub fn request_for(&self, args: Value) -> Result<BackendRequest, HandlerError> {
        let mut args = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err("tool arguments must be a JSON object".into()),
        };
        let segments = self.template.render(&mut args)?;
        let mut request = BackendRequest {
            method: self.method,
            segments,
            query: Vec::new(),
            body: None,
        };
        if self.method.uses_query() {
            for (key, value) in args {
                if value.is_null() {
                    continue;
                }
                let text = scalar_text(&value).unwrap_or_else(|| value.to_string());
                request.query.push((key, text));
            }
        } else {
            request.body = Some(Value::Object(args));
        }
        Ok(request)
    }
}

#[async_trait]
impl ToolHandler for ForwardTool {
    async fn call(
        &self,
        args: Value,
        ctx: Option<&AuthContext>,
    ) -> Result<ToolOutput, HandlerError> {
        let token = ctx.map_or("", AuthContext::session_token);
        if token.is_empty() {
            return Err("backend calls require a signed-in session".into());
        }
        let request = self.request_for(args)?;
        match self.backend.send(token, request).await? {
            Value::String(text) => Ok(ToolOutput::Text(text)),
            value => Ok(ToolOutput::Json(value)),
        }
    }
}

// ============================================================================
// SECTION: Domains
// ============================================================================

/// Builds a catalog domain from its config section.
///
/// # Errors
///
/// Returns [`ConfigError`] when a tool schema or path is invalid.
pub fn forwarding_domain(
    config: &DomainConfig,
    backend: &Arc<BackendClient>,
) -> Result<ToolDomain, ConfigError> {
    let mut tools = Vec::with_capacity(config.tools.len());
    for tool in &config.tools {
        let handler = Arc::new(ForwardTool::new(tool, Arc::clone(backend))?);
        tools.push(
            ToolDescriptor::builder(tool.name.clone(), handler)
                .description(tool.description.clone())
                .input_schema(tool.input_schema_json()?)
                .requires_auth(tool.requires_auth)
                .permissions(tool.required_permissions.iter().map(String::as_str))
                .build(),
        );
    }
    Ok(ToolDomain::new(config.name.clone(), config.description.clone(), tools))
}
