// crates/switchboard-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for switchboard-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use switchboard_config::ConfigError;
use switchboard_config::SwitchboardConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `SwitchboardConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<SwitchboardConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<SwitchboardConfig, toml::de::Error> {
    config_from_toml("")
}

/// Asserts that a validation result is an error containing a specific substring.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// A CRM domain with one GET tool using a path placeholder.
pub const CRM_DOMAIN: &str = r#"
[[domains]]
name = "crm"
description = "CRM tools"

[[domains.tools]]
name = "crm_get_contact"
description = "Fetch one contact"
required_permissions = ["view_crm"]
method = "GET"
path = "/v1/contacts/{contactId}"

[domains.tools.input_schema]
type = "object"
required = ["contactId"]

[domains.tools.input_schema.properties.contactId]
type = "string"
"#;
