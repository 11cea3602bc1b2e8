// crates/switchboard-config/src/lib.rs
// ============================================================================
// Module: Switchboard Config Library
// Description: Canonical config model, loading, and validation.
// Purpose: Single source of truth for switchboard.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `switchboard-config` defines the configuration model for the Switchboard
//! tool server: transport settings, the session file location, the identity
//! authority and backend endpoints, and the config-declared forwarding tool
//! domains. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
