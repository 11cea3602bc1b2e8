// crates/switchboard-mcp/src/identity.rs
// ============================================================================
// Module: HTTP Identity Authority
// Description: Remote bearer-token validation over HTTP.
// Purpose: Supply live identity and permissions to the auth context resolver.
// Dependencies: reqwest, switchboard-config, switchboard-core
// ============================================================================

//! ## Overview
//! [`HttpIdentityAuthority`] calls `GET {base_url}{validate_path}` with the
//! session token as a bearer credential. A 2xx answer is parsed as an
//! [`IdentityValidation`]; 401 and 403 are an explicit rejection; anything
//! else is reported as unavailable so the resolver fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use switchboard_config::IdentityConfig;
use switchboard_core::IdentityAuthority;
use switchboard_core::IdentityAuthorityError;
use switchboard_core::IdentityValidation;

// ============================================================================
// SECTION: Authority
// ============================================================================

/// Identity authority reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityAuthority {
    /// Full validation endpoint URL.
    endpoint: String,
    /// Shared HTTP client with configured timeouts.
    client: Client,
}

impl HttpIdentityAuthority {
    /// Builds an authority for the validation endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityAuthorityError::Unavailable`] when the HTTP client
    /// cannot be constructed.
    pub fn new(
        mut base_url: String,
        validate_path: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, IdentityAuthorityError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| IdentityAuthorityError::Unavailable(err.to_string()))?;
        let trimmed_len = base_url.trim_end_matches('/').len();
        base_url.truncate(trimmed_len);
        base_url.push_str(validate_path);
        Ok(Self {
            endpoint: base_url,
            client,
        })
    }

    /// Builds an authority from the `[identity]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityAuthorityError::Unavailable`] when the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, IdentityAuthorityError> {
        Self::new(
            config.base_url.clone(),
            &config.validate_path,
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// Returns the validation endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl IdentityAuthority for HttpIdentityAuthority {
    async fn validate(&self, token: &str) -> Result<IdentityValidation, IdentityAuthorityError> {
        let Ok(mut header) = HeaderValue::from_str(&format!("Bearer {token}")) else {
            // Tokens that cannot be sent as a header can never be valid.
            return Ok(IdentityValidation::invalid());
        };
        header.set_sensitive(true);
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await
            .map_err(|err| IdentityAuthorityError::Unavailable(err.to_string()))?;
        match response.status() {
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|err| IdentityAuthorityError::Unavailable(err.to_string()))?;
                serde_json::from_slice(&body)
                    .map_err(|err| IdentityAuthorityError::InvalidResponse(err.to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(IdentityValidation::invalid()),
            status => Err(IdentityAuthorityError::Unavailable(format!(
                "identity authority error: status {status}"
            ))),
        }
    }
}
