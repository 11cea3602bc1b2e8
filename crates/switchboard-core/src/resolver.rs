// crates/switchboard-core/src/resolver.rs
// ============================================================================
// Module: Switchboard Auth Context Resolver
// Description: Turns the persisted session into a per-request auth context.
// Purpose: Fail-closed identity resolution against the identity authority.
// Dependencies: crate::{identity, interfaces, permissions}, time
// ============================================================================

//! ## Overview
//! Resolution reads the persisted session, rejects it locally when it has no
//! token or has expired, validates the token with the identity authority, and
//! merges the live answer over the cached session fields.
//!
//! ## Invariants
//! - Never returns an error: every failure yields no context.
//! - The persisted session is only read, never written.
//! - A valid answer always resolves; identifiers missing from both the answer
//!   and the cache stay absent in the context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use time::OffsetDateTime;

use crate::identity::AuthContext;
use crate::identity::IdentityValidation;
use crate::identity::Session;
use crate::interfaces::CredentialStore;
use crate::interfaces::IdentityAuthority;
use crate::permissions::PermissionSet;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Why a resolution ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A full context was produced.
    Resolved,
    /// No session is stored.
    NoSession,
    /// The stored session has no token.
    MissingToken,
    /// The credential store could not be read.
    StoreError,
    /// The session expired locally; the authority was not contacted.
    Expired,
    /// The identity authority failed.
    AuthorityUnavailable,
    /// The identity authority rejected the token.
    Rejected,
}

impl ResolutionOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NoSession => "no_session",
            Self::MissingToken => "missing_token",
            Self::StoreError => "store_error",
            Self::Expired => "expired",
            Self::AuthorityUnavailable => "authority_unavailable",
            Self::Rejected => "rejected",
        }
    }
}

/// Result of one resolution attempt.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Resolved context, if any.
    pub context: Option<AuthContext>,
    /// Outcome label.
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    /// Builds an unauthenticated resolution.
    const fn unauthenticated(outcome: ResolutionOutcome) -> Self {
        Self {
            context: None,
            outcome,
        }
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves auth contexts from stored sessions.
#[derive(Clone)]
pub struct AuthContextResolver {
    /// Persisted session source.
    store: Arc<dyn CredentialStore>,
    /// Live token validation.
    authority: Arc<dyn IdentityAuthority>,
}

impl AuthContextResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, authority: Arc<dyn IdentityAuthority>) -> Self {
        Self {
            store,
            authority,
        }
    }

    /// Resolves the current caller, or `None` on any failure.
    pub async fn resolve(&self) -> Option<AuthContext> {
        self.resolve_detailed(OffsetDateTime::now_utc()).await.context
    }

    /// Resolves the caller at `now`, reporting why resolution ended.
    pub async fn resolve_detailed(&self, now: OffsetDateTime) -> Resolution {
        let session = match self.store.read_session() {
            Ok(Some(session)) => session,
            Ok(None) => return Resolution::unauthenticated(ResolutionOutcome::NoSession),
            Err(_) => return Resolution::unauthenticated(ResolutionOutcome::StoreError),
        };
        let Some(token) = session.bearer_token() else {
            return Resolution::unauthenticated(ResolutionOutcome::MissingToken);
        };
        if session.is_expired_at(now) {
            return Resolution::unauthenticated(ResolutionOutcome::Expired);
        }
        let validation = match self.authority.validate(token).await {
            Ok(validation) => validation,
            Err(_) => return Resolution::unauthenticated(ResolutionOutcome::AuthorityUnavailable),
        };
        if !validation.valid {
            return Resolution::unauthenticated(ResolutionOutcome::Rejected);
        }
        merge(&session, token, validation)
    }
}

/// Merges the live validation over the cached session fields.
fn merge(session: &Session, token: &str, validation: IdentityValidation) -> Resolution {
    let user_id = validation.user_id.or_else(|| session.user_id.clone());
    let organization_id = validation.organization_id.or_else(|| session.organization_id.clone());
    let organization_name =
        validation.organization_name.or_else(|| session.organization_name.clone());
    let email = validation.email.or_else(|| session.email.clone());
    let grants = validation.permissions.or_else(|| session.permissions.clone()).unwrap_or_default();
    Resolution {
        context: Some(AuthContext::new(
            user_id,
            organization_id,
            organization_name,
            email,
            token.to_string(),
            PermissionSet::from_grants(grants),
        )),
        outcome: ResolutionOutcome::Resolved,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
