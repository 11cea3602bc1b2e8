// crates/switchboard-mcp/src/catalog.rs
// ============================================================================
// Module: Catalog Assembly
// Description: Builds the runtime tool catalog from configuration.
// Purpose: Combine the built-in session domain with configured forwarding domains.
// Dependencies: switchboard-config, switchboard-core
// ============================================================================

//! ## Overview
//! The session domain is always registered first, followed by every
//! `[[domains]]` entry in file order. The finished catalog is shared through
//! an [`Arc`] and a [`CatalogHandle`] so `list_capabilities` can describe the
//! catalog it belongs to.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::Weak;

use switchboard_config::ConfigError;
use switchboard_config::SwitchboardConfig;
use switchboard_core::Catalog;
use switchboard_core::CatalogError;
use switchboard_core::CredentialStore;
use switchboard_core::ToolDomain;
use thiserror::Error;

use crate::backend::BackendClient;
use crate::forward::forwarding_domain;
use crate::session_tools::session_domain;

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Late-bound, non-owning reference to the finished catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
    /// Set once after the catalog is built.
    slot: Arc<OnceLock<Weak<Catalog>>>,
}

impl CatalogHandle {
    /// Creates an unbound handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the handle to the catalog. Later binds are ignored.
    pub fn bind(&self, catalog: &Arc<Catalog>) {
        let _ = self.slot.set(Arc::downgrade(catalog));
    }

    /// Returns the catalog while it is alive and bound.
    #[must_use]
    pub fn get(&self) -> Option<Arc<Catalog>> {
        self.slot.get().and_then(Weak::upgrade)
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Catalog assembly failures.
#[derive(Debug, Error)]
pub enum CatalogBuildError {
    /// A configured tool could not be turned into a descriptor.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The assembled catalog violates a catalog invariant.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Builds the full runtime catalog.
///
/// # Errors
///
/// Returns [`CatalogBuildError`] when a configured tool is invalid or the
/// combined catalog has duplicate tool names.
pub fn build_catalog(
    config: &SwitchboardConfig,
    store: Arc<dyn CredentialStore>,
    backend: Arc<BackendClient>,
) -> Result<Arc<Catalog>, CatalogBuildError> {
    let handle = CatalogHandle::new();
    let mut domains: Vec<ToolDomain> =
        vec![session_domain(handle.clone(), store, Arc::clone(&backend))];
    for domain in &config.domains {
        domains.push(forwarding_domain(domain, &backend)?);
    }
    let catalog = Arc::new(Catalog::new(domains)?);
    handle.bind(&catalog);
    Ok(catalog)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
