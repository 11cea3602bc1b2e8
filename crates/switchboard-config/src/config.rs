// crates/switchboard-config/src/config.rs
// ============================================================================
// Module: Switchboard Configuration
// Description: Configuration loading and validation for Switchboard.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, serde_json, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing sections fall back to loopback-safe defaults; invalid values fail
//! closed. Security posture: config inputs are untrusted, and the server acts
//! with the locally logged-in user's credentials, so network exposure and
//! plaintext upstreams require explicit opt-in.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Host;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "switchboard.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SWITCHBOARD_CONFIG";
/// Environment variable used to override the session file path.
pub const SESSION_FILE_ENV_VAR: &str = "SWITCHBOARD_SESSION_FILE";
/// Session file location relative to the home directory.
const DEFAULT_SESSION_RELATIVE_PATH: &str = ".switchboard/session.json";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for `server.max_body_bytes`.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default maximum request body size.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default maximum concurrent requests.
pub(crate) const DEFAULT_MAX_INFLIGHT: usize = 64;
/// Upper bound for `server.max_inflight`.
pub(crate) const MAX_INFLIGHT_LIMIT: usize = 4096;
/// Minimum connect timeout for upstream calls.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum connect timeout for upstream calls.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum request timeout for upstream calls.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum request timeout for upstream calls.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;
/// Default connect timeout for upstream calls.
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
/// Default request timeout for upstream calls.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Default identity authority base URL.
const DEFAULT_IDENTITY_BASE_URL: &str = "http://127.0.0.1:8787";
/// Default identity validation path.
const DEFAULT_VALIDATE_PATH: &str = "/v1/auth/validate";
/// Default backend base URL.
const DEFAULT_BACKEND_BASE_URL: &str = "http://127.0.0.1:8787";
/// Default maximum backend response size.
pub(crate) const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
/// Upper bound for backend response size.
pub(crate) const MAX_RESPONSE_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Maximum number of configured domains.
pub(crate) const MAX_DOMAINS: usize = 64;
/// Maximum number of tools per configured domain.
pub(crate) const MAX_TOOLS_PER_DOMAIN: usize = 256;
/// Maximum tool name length.
pub(crate) const MAX_TOOL_NAME_LENGTH: usize = 128;
/// Domain name reserved for the built-in session tools.
pub const RESERVED_DOMAIN_NAME: &str = "session";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Switchboard configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session file configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Identity authority configuration.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Backend API configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Forwarding tool domains.
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

impl SwitchboardConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.session.validate()?;
        self.identity.validate()?;
        self.backend.validate()?;
        if self.domains.len() > MAX_DOMAINS {
            return Err(ConfigError::Invalid(format!("at most {MAX_DOMAINS} domains allowed")));
        }
        let mut domain_names = BTreeSet::new();
        let mut tool_names = BTreeSet::new();
        for domain in &self.domains {
            domain.validate()?;
            if !domain_names.insert(domain.name.trim()) {
                return Err(ConfigError::Invalid(format!("duplicate domain name: {}", domain.name)));
            }
            for tool in &domain.tools {
                if !tool_names.insert(tool.name.as_str()) {
                    return Err(ConfigError::Invalid(format!("duplicate tool name: {}", tool.name)));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Supported MCP transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Allow binding the HTTP transport to a non-loopback address.
    #[serde(default)]
    pub allow_non_loopback: bool,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Maximum concurrently executing requests.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            allow_non_loopback: false,
            max_body_bytes: default_max_body_bytes(),
            max_inflight: default_max_inflight(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        if self.max_inflight == 0 || self.max_inflight > MAX_INFLIGHT_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_inflight must be between 1 and {MAX_INFLIGHT_LIMIT}"
            )));
        }
        self.audit.validate()?;
        match self.transport {
            ServerTransport::Http => {
                let addr = self.bind_addr()?;
                if !addr.ip().is_loopback() && !self.allow_non_loopback {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind requires server.allow_non_loopback".to_string(),
                    ));
                }
            }
            ServerTransport::Stdio => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "stdio transport does not accept a bind address".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parses the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is missing or invalid.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("http transport requires bind address".to_string()));
        }
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines). Stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Session file configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Explicit session file path.
    #[serde(default)]
    pub path: Option<String>,
}

impl SessionConfig {
    /// Validates session configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("session.path", path)?;
        }
        Ok(())
    }

    /// Resolves the session file path.
    ///
    /// Order: `session.path`, then `SWITCHBOARD_SESSION_FILE`, then
    /// `$HOME/.switchboard/session.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no location can be determined.
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_session_path(
            self.path.as_deref(),
            env::var(SESSION_FILE_ENV_VAR).ok(),
            env::var_os("HOME").map(PathBuf::from),
        )
    }
}

/// Resolves the session path from explicit inputs.
fn resolve_session_path(
    configured: Option<&str>,
    env_value: Option<String>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = configured {
        return Ok(PathBuf::from(path.trim()));
    }
    if let Some(path) = env_value.filter(|value| !value.trim().is_empty()) {
        validate_path_string(SESSION_FILE_ENV_VAR, &path)?;
        return Ok(PathBuf::from(path.trim()));
    }
    let home = home.filter(|home| !home.as_os_str().is_empty()).ok_or_else(|| {
        ConfigError::Invalid(format!(
            "cannot locate session file: set session.path or {SESSION_FILE_ENV_VAR}"
        ))
    })?;
    Ok(home.join(DEFAULT_SESSION_RELATIVE_PATH))
}

// ============================================================================
// SECTION: Upstream Endpoints
// ============================================================================

/// Identity authority configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Base URL of the identity authority.
    #[serde(default = "default_identity_base_url")]
    pub base_url: String,
    /// Validation endpoint path.
    #[serde(default = "default_validate_path")]
    pub validate_path: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Allow plain http to non-loopback hosts.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_base_url(),
            validate_path: default_validate_path(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            allow_insecure_http: false,
        }
    }
}

impl IdentityConfig {
    /// Validates identity authority configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("identity.base_url", &self.base_url, self.allow_insecure_http)?;
        validate_endpoint_path("identity.validate_path", &self.validate_path)?;
        validate_timeouts("identity", self.connect_timeout_ms, self.request_timeout_ms)
    }
}

/// Backend API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the backend API.
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum accepted response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Allow plain http to non-loopback hosts.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            allow_insecure_http: false,
        }
    }
}

impl BackendConfig {
    /// Validates backend configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("backend.base_url", &self.base_url, self.allow_insecure_http)?;
        validate_timeouts("backend", self.connect_timeout_ms, self.request_timeout_ms)?;
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "backend.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Forwarding Domains
// ============================================================================

/// Config-declared tool domain.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    /// Domain name.
    pub name: String,
    /// Domain description.
    #[serde(default)]
    pub description: String,
    /// Tools in declaration order.
    #[serde(default)]
    pub tools: Vec<ForwardToolConfig>,
}

impl DomainConfig {
    /// Validates a domain and its tools.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("domain name is empty".to_string()));
        }
        if name == RESERVED_DOMAIN_NAME {
            return Err(ConfigError::Invalid(format!(
                "domain name {RESERVED_DOMAIN_NAME} is reserved for built-in tools"
            )));
        }
        if self.tools.len() > MAX_TOOLS_PER_DOMAIN {
            return Err(ConfigError::Invalid(format!(
                "domain {name} exceeds {MAX_TOOLS_PER_DOMAIN} tools"
            )));
        }
        for tool in &self.tools {
            tool.validate()?;
        }
        Ok(())
    }
}

/// HTTP methods supported by forwarding tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET with arguments in the query string.
    #[default]
    Get,
    /// POST with a JSON body.
    Post,
    /// PUT with a JSON body.
    Put,
    /// PATCH with a JSON body.
    Patch,
    /// DELETE with arguments in the query string.
    Delete,
}

impl HttpMethod {
    /// Returns the canonical method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Returns true when arguments travel in the query string.
    #[must_use]
    pub const fn uses_query(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

/// Config-declared tool that forwards to the backend API.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardToolConfig {
    /// Tool name, unique across the catalog.
    pub name: String,
    /// Tool description.
    #[serde(default)]
    pub description: String,
    /// JSON schema for arguments, written as a TOML table.
    #[serde(default)]
    pub input_schema: Option<toml::Value>,
    /// Whether an authenticated caller is required.
    #[serde(default = "default_requires_auth")]
    pub requires_auth: bool,
    /// Required permissions.
    #[serde(default)]
    pub required_permissions: Vec<String>,
    /// Backend HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Backend path, optionally with `{field}` placeholders.
    pub path: String,
}

impl ForwardToolConfig {
    /// Validates a forwarding tool.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("tool name is empty".to_string()));
        }
        if name.len() > MAX_TOOL_NAME_LENGTH || name != self.name {
            return Err(ConfigError::Invalid(format!("tool name {} is malformed", self.name)));
        }
        if !self.requires_auth && !self.required_permissions.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "tool {name} declares required_permissions but requires_auth = false"
            )));
        }
        if self.required_permissions.iter().any(|permission| permission.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("tool {name} has an empty permission")));
        }
        validate_endpoint_path(&format!("tool {name} path"), &self.path)?;
        let schema = self.input_schema_json()?;
        let properties = schema.get("properties").and_then(Value::as_object);
        for placeholder in path_placeholders(&self.path)? {
            if !properties.is_some_and(|props| props.contains_key(&placeholder)) {
                return Err(ConfigError::Invalid(format!(
                    "tool {name} path placeholder {{{placeholder}}} is not an input_schema property"
                )));
            }
        }
        Ok(())
    }

    /// Returns the input schema as JSON, defaulting to an empty object schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the schema is not a JSON object.
    pub fn input_schema_json(&self) -> Result<Value, ConfigError> {
        let Some(schema) = &self.input_schema else {
            return Ok(serde_json::json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }));
        };
        let value = serde_json::to_value(schema)
            .map_err(|err| ConfigError::Invalid(format!("tool {} input_schema: {err}", self.name)))?;
        if !value.is_object() {
            return Err(ConfigError::Invalid(format!(
                "tool {} input_schema must be a table",
                self.name
            )));
        }
        Ok(value)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts `{field}` placeholder names from a backend path, in order.
///
/// # Errors
///
/// Returns [`ConfigError`] for unbalanced braces or empty placeholder names.
pub fn path_placeholders(path: &str) -> Result<Vec<String>, ConfigError> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(open) = rest.find(['{', '}']) {
        if rest[open ..].starts_with('}') {
            return Err(ConfigError::Invalid(format!("unbalanced '}}' in path {path}")));
        }
        let after = &rest[open + 1 ..];
        let close = after
            .find(['{', '}'])
            .filter(|idx| after[*idx ..].starts_with('}'))
            .ok_or_else(|| ConfigError::Invalid(format!("unbalanced '{{' in path {path}")))?;
        let name = after[.. close].trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid(format!("empty placeholder in path {path}")));
        }
        names.push(name.to_string());
        rest = &after[close + 1 ..];
    }
    Ok(names)
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an upstream base URL.
fn validate_base_url(field: &str, value: &str, allow_insecure_http: bool) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" => {
            if !allow_insecure_http && !host_is_loopback(url.host()) {
                return Err(ConfigError::Invalid(format!(
                    "{field} uses http:// to a non-loopback host without allow_insecure_http"
                )));
            }
        }
        _ => {
            return Err(ConfigError::Invalid(format!("{field} must use http:// or https://")));
        }
    }
    if url.host().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::Invalid(format!("{field} must not carry a query or fragment")));
    }
    Ok(())
}

/// Returns true when the URL host is a loopback name or address.
fn host_is_loopback(host: Option<Host<&str>>) -> bool {
    match host {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => IpAddr::V4(addr).is_loopback(),
        Some(Host::Ipv6(addr)) => IpAddr::V6(addr).is_loopback(),
        None => false,
    }
}

/// Validates an endpoint path appended to a base URL.
fn validate_endpoint_path(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must start with '/'")));
    }
    if value.contains("://") || value.contains(['?', '#']) || value.contains(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} must be a plain path")));
    }
    if value.split('/').any(|segment| segment == "..") {
        return Err(ConfigError::Invalid(format!("{field} must not contain '..' segments")));
    }
    Ok(())
}

/// Validates a connect/request timeout pair.
fn validate_timeouts(section: &str, connect_ms: u64, request_ms: u64) -> Result<(), ConfigError> {
    validate_timeout_range(
        &format!("{section}.connect_timeout_ms"),
        connect_ms,
        MIN_CONNECT_TIMEOUT_MS,
        MAX_CONNECT_TIMEOUT_MS,
    )?;
    validate_timeout_range(
        &format!("{section}.request_timeout_ms"),
        request_ms,
        MIN_REQUEST_TIMEOUT_MS,
        MAX_REQUEST_TIMEOUT_MS,
    )?;
    if request_ms < connect_ms {
        return Err(ConfigError::Invalid(format!(
            "{section}.request_timeout_ms must be >= connect_timeout_ms"
        )));
    }
    Ok(())
}

/// Validates a timeout value against bounds.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Default maximum request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default maximum inflight requests.
pub(crate) const fn default_max_inflight() -> usize {
    DEFAULT_MAX_INFLIGHT
}

/// Default audit logging enabled.
pub(crate) const fn default_audit_enabled() -> bool {
    true
}

/// Default identity authority base URL.
fn default_identity_base_url() -> String {
    DEFAULT_IDENTITY_BASE_URL.to_string()
}

/// Default identity validation path.
fn default_validate_path() -> String {
    DEFAULT_VALIDATE_PATH.to_string()
}

/// Default backend base URL.
fn default_backend_base_url() -> String {
    DEFAULT_BACKEND_BASE_URL.to_string()
}

/// Default connect timeout.
pub(crate) const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default request timeout.
pub(crate) const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default maximum backend response size.
pub(crate) const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Tools require authentication unless declared otherwise.
const fn default_requires_auth() -> bool {
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================
