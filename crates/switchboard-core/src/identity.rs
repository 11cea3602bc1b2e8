// crates/switchboard-core/src/identity.rs
// ============================================================================
// Module: Switchboard Identity
// Description: Persisted session records and resolved per-request identities.
// Purpose: Define the session file shape and the immutable auth context.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`Session`] is the persisted proof of login written by the login flow.
//! An [`AuthContext`] is the identity resolved for exactly one request after
//! the session has been validated against the identity authority. The
//! [`IdentityValidation`] type is the authority's answer.
//!
//! ## Invariants
//! - An [`AuthContext`] is either fully populated or not constructed at all.
//! - Session tokens never appear in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::permissions::PermissionSet;

// ============================================================================
// SECTION: Session
// ============================================================================

/// Persisted proof of login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token issued at login. Blank means no usable token.
    #[serde(default)]
    pub token: String,
    /// Local expiry; `None` never expires locally.
    #[serde(default, with = "expiry_format", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<OffsetDateTime>,
    /// Cached user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Cached email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Cached active organization identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Cached active organization display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// Cached grant list from the last successful validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl Session {
    /// Creates a session holding only a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
            user_id: None,
            email: None,
            organization_id: None,
            organization_name: None,
            permissions: None,
        }
    }

    /// Returns the bearer token when one is present.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.token.trim();
        if token.is_empty() { None } else { Some(token) }
    }

    /// Returns true when the local expiry has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Copies identity fields from a successful validation into the cache.
    pub fn absorb(&mut self, validation: &IdentityValidation) {
        if let Some(user_id) = &validation.user_id {
            self.user_id = Some(user_id.clone());
        }
        if let Some(email) = &validation.email {
            self.email = Some(email.clone());
        }
        if let Some(organization_id) = &validation.organization_id {
            self.organization_id = Some(organization_id.clone());
        }
        if let Some(organization_name) = &validation.organization_name {
            self.organization_name = Some(organization_name.clone());
        }
        if let Some(permissions) = &validation.permissions {
            self.permissions = Some(permissions.clone());
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("organization_id", &self.organization_id)
            .field("organization_name", &self.organization_name)
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// Serde helpers for session expiry timestamps.
///
/// Accepts RFC 3339 strings or integer epoch milliseconds; writes RFC 3339.
mod expiry_format {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    /// Raw expiry encodings found in session files.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawExpiry {
        /// Epoch milliseconds.
        Millis(i64),
        /// RFC 3339 timestamp.
        Text(String),
    }

    /// Serializes an optional expiry as RFC 3339.
    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(expires_at) => {
                let text = expires_at.format(&Rfc3339).map_err(S::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional expiry from either supported encoding.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<RawExpiry>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawExpiry::Millis(millis)) => {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                    .map(Some)
                    .map_err(D::Error::custom)
            }
            Some(RawExpiry::Text(text)) => {
                OffsetDateTime::parse(&text, &Rfc3339).map(Some).map_err(D::Error::custom)
            }
        }
    }
}

// ============================================================================
// SECTION: Identity Validation
// ============================================================================

/// Identity authority answer for a bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityValidation {
    /// Whether the token is valid. Missing means invalid.
    #[serde(default)]
    pub valid: bool,
    /// User identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Active organization identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Active organization display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Live grant list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl IdentityValidation {
    /// Returns an explicit "invalid token" answer.
    #[must_use]
    pub fn invalid() -> Self {
        Self::default()
    }
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Resolved identity and permissions for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// User identifier, when the authority or cache supplied one.
    user_id: Option<String>,
    /// Active organization identifier, when known.
    organization_id: Option<String>,
    /// Active organization display name.
    organization_name: Option<String>,
    /// Email address.
    email: Option<String>,
    /// Bearer token used for downstream backend calls.
    session_token: String,
    /// Permissions held for this request.
    permissions: PermissionSet,
}

impl AuthContext {
    /// Builds an auth context.
    #[must_use]
    pub const fn new(
        user_id: Option<String>,
        organization_id: Option<String>,
        organization_name: Option<String>,
        email: Option<String>,
        session_token: String,
        permissions: PermissionSet,
    ) -> Self {
        Self {
            user_id,
            organization_id,
            organization_name,
            email,
            session_token,
            permissions,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the active organization identifier.
    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// Returns the active organization display name.
    #[must_use]
    pub fn organization_name(&self) -> Option<&str> {
        self.organization_name.as_deref()
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the bearer token for backend calls.
    #[must_use]
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Returns the held permissions.
    #[must_use]
    pub const fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("user_id", &self.user_id)
            .field("organization_id", &self.organization_id)
            .field("organization_name", &self.organization_name)
            .field("email", &self.email)
            .field("session_token", &"<redacted>")
            .field("permissions", &self.permissions)
            .finish()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
