// crates/switchboard-mcp/src/backend.rs
// ============================================================================
// Module: Backend Client
// Description: Authenticated JSON calls to the remote business API.
// Purpose: Shared transport for session and forwarding tool handlers.
// Dependencies: reqwest, serde_json, switchboard-config, url
// ============================================================================

//! ## Overview
//! [`BackendClient`] sends one JSON request per tool invocation with the
//! caller's session token as a bearer credential. Path segments and query
//! pairs are assembled with [`url::Url`], so argument values are always
//! percent-encoded. Response bodies are capped at the configured size.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::Method;
use reqwest::header::HeaderValue;
use serde_json::Value;
use switchboard_config::BackendConfig;
use switchboard_config::HttpMethod;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum characters of a backend error body echoed into messages.
const MAX_ERROR_DETAIL_CHARS: usize = 200;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Backend call failures. Surfaced to callers as tool handler failures.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request could not be built from the tool arguments.
    #[error("invalid backend request: {0}")]
    InvalidRequest(String),
    /// Network failure or timeout.
    #[error("backend unavailable: {0}")]
    Transport(String),
    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error detail extracted from the response body.
        detail: String,
    },
    /// Response exceeded the configured size limit.
    #[error("backend response exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },
    /// Response body was not usable.
    #[error("backend response invalid: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// One backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Decoded path segments appended to the base URL.
    pub segments: Vec<String>,
    /// Decoded query pairs.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl BackendRequest {
    /// Builds a request for a literal path such as `/v1/organizations`.
    #[must_use]
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            segments: path.split('/').filter(|segment| !segment.is_empty()).map(str::to_string).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client for the business backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// Base URL; request segments are appended to its path.
    base_url: Url,
    /// Shared HTTP client with configured timeouts.
    client: Client,
    /// Response size cap in bytes.
    max_response_bytes: usize,
}

impl BackendClient {
    /// Builds a client for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidRequest`] when the base URL is invalid
    /// and [`BackendError::Transport`] when the client cannot be built.
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
        max_response_bytes: usize,
    ) -> Result<Self, BackendError> {
        let base_url =
            Url::parse(base_url).map_err(|err| BackendError::InvalidRequest(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidRequest(format!("{base_url} cannot be a base url")));
        }
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        Ok(Self {
            base_url,
            client,
            max_response_bytes,
        })
    }

    /// Builds a client from the `[backend]` config section.
    ///
    /// # Errors
    ///
    /// See [`BackendClient::new`].
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::new(
            &config.base_url,
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
            config.max_response_bytes,
        )
    }

    /// Resolves the full URL for a request.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidRequest`] when the URL cannot be built.
    pub fn url_for(&self, request: &BackendRequest) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                BackendError::InvalidRequest("backend base url cannot carry a path".to_string())
            })?;
            path.pop_if_empty();
            path.extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    /// Sends a request with the caller's bearer token and returns the JSON
    /// response. An empty body yields `Value::Null`; a non-JSON text body is
    /// returned as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on transport failures, non-2xx statuses, or
    /// oversized and non-UTF-8 responses.
    pub async fn send(&self, token: &str, request: BackendRequest) -> Result<Value, BackendError> {
        let url = self.url_for(&request)?;
        let mut header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| BackendError::InvalidRequest("invalid session token".to_string()))?;
        header.set_sensitive(true);
        let mut builder = self
            .client
            .request(method_for(request.method), url)
            .header(reqwest::header::AUTHORIZATION, header)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let mut response =
            builder.send().await.map_err(|err| BackendError::Transport(err.to_string()))?;
        let limit = u64::try_from(self.max_response_bytes).unwrap_or(u64::MAX);
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(BackendError::ResponseTooLarge {
                limit: self.max_response_bytes,
            });
        }
        let status = response.status();
        let mut body = Vec::new();
        while let Some(chunk) =
            response.chunk().await.map_err(|err| BackendError::Transport(err.to_string()))?
        {
            if body.len().saturating_add(chunk.len()) > self.max_response_bytes {
                return Err(BackendError::ResponseTooLarge {
                    limit: self.max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                detail: error_detail(&body, status.canonical_reason().unwrap_or("error")),
            });
        }
        decode_body(&body)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps config methods onto reqwest methods.
const fn method_for(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Decodes a success body.
fn decode_body(body: &[u8]) -> Result<Value, BackendError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    if let Ok(value) = serde_json::from_slice(body) {
        return Ok(value);
    }
    std::str::from_utf8(body)
        .map(|text| Value::String(text.to_string()))
        .map_err(|_| BackendError::InvalidResponse("response is neither JSON nor UTF-8".to_string()))
}

/// Extracts a short error message from an error body.
fn error_detail(body: &[u8], fallback: &str) -> String {
    let from_json = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        ["error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    let detail = from_json.unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    if detail.is_empty() {
        return fallback.to_string();
    }
    detail.chars().take(MAX_ERROR_DETAIL_CHARS).collect()
}
