// crates/switchboard-core/src/permissions.rs
// ============================================================================
// Module: Switchboard Permissions
// Description: Capability tokens and the permission set held by a caller.
// Purpose: Make the unrestricted grant an explicit variant instead of a magic string.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Permission`] is an opaque capability token such as `manage_crm`. The
//! permissions held by a caller are a [`PermissionSet`], which is either a
//! restricted set of tokens or [`PermissionSet::Unrestricted`]. The wildcard
//! grant `"*"` only exists on the wire: [`PermissionSet::from_grants`] turns it
//! into the `Unrestricted` variant and [`PermissionSet::grants`] turns it back.
//!
//! ## Invariants
//! - `Restricted` never contains the wildcard token.
//! - Whoever issues the grant list (the identity authority) decides who is
//!   unrestricted; this module only changes the representation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wire grant that denotes unrestricted access.
pub const WILDCARD_GRANT: &str = "*";

// ============================================================================
// SECTION: Permission
// ============================================================================

/// Capability token gating a tool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Creates a new permission token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Permission Set
// ============================================================================

/// Permissions held by an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    /// Only the listed permissions are held.
    Restricted(BTreeSet<Permission>),
    /// Every permission is held.
    Unrestricted,
}

impl PermissionSet {
    /// Returns an empty restricted set.
    #[must_use]
    pub const fn none() -> Self {
        Self::Restricted(BTreeSet::new())
    }

    /// Builds a permission set from a wire grant list.
    ///
    /// Any wildcard grant makes the whole set unrestricted. Blank grants are
    /// ignored.
    pub fn from_grants<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut held = BTreeSet::new();
        for grant in grants {
            let grant = grant.into();
            let trimmed = grant.trim();
            if trimmed == WILDCARD_GRANT {
                return Self::Unrestricted;
            }
            if !trimmed.is_empty() {
                held.insert(Permission::new(trimmed));
            }
        }
        Self::Restricted(held)
    }

    /// Returns true when the set holds the given permission.
    #[must_use]
    pub fn allows(&self, permission: &Permission) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Restricted(held) => held.contains(permission),
        }
    }

    /// Returns the first required permission that is not held, in declaration order.
    #[must_use]
    pub fn first_missing<'a>(&self, required: &'a [Permission]) -> Option<&'a Permission> {
        required.iter().find(|permission| !self.allows(permission))
    }

    /// Returns true when every required permission is held.
    #[must_use]
    pub fn allows_all(&self, required: &[Permission]) -> bool {
        self.first_missing(required).is_none()
    }

    /// Returns true for the unrestricted variant.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Returns the wire grant list for this set.
    #[must_use]
    pub fn grants(&self) -> Vec<String> {
        match self {
            Self::Unrestricted => vec![WILDCARD_GRANT.to_string()],
            Self::Restricted(held) => held.iter().map(|p| p.as_str().to_string()).collect(),
        }
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self::none()
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.grants().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let grants = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_grants(grants))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
