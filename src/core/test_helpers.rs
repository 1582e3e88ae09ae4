//! Shared test utilities for core module tests
//!
//! Provides canonical rule documents so validator tests agree on what a
//! "good" rule looks like. This module is only compiled in test mode.

use crate::config::PolicyConfig;
use crate::core::rule::FirewallRule;
use serde_json::{Value, json};

/// Fully populated allow rule that passes every check under the default policy.
pub fn sample_allow_rule() -> Value {
    json!({
        "rule_name": "Test-Allow-Rule",
        "description": "Test allow rule for unit testing",
        "source_zone": ["trust"],
        "destination_zone": ["untrust"],
        "source_address": ["192.168.1.0/24"],
        "destination_address": ["10.0.0.1"],
        "application": ["web-browsing"],
        "service": ["tcp-80"],
        "action": "allow",
        "log_at_session_start": true,
        "log_at_session_end": true,
        "tag": ["test"],
        "metadata": {
            "ticket_id": "TEST-001",
            "requested_by": "Test User",
            "environment": "development"
        }
    })
}

/// Deny rule from untrust with `any` source.
pub fn sample_deny_rule() -> Value {
    json!({
        "rule_name": "Test-Deny-Rule",
        "description": "Test deny rule for unit testing",
        "source_zone": ["untrust"],
        "destination_zone": ["trust"],
        "source_address": ["any"],
        "destination_address": ["192.168.1.0/24"],
        "application": ["any"],
        "service": ["any"],
        "action": "deny",
        "log_at_session_start": true,
        "log_at_session_end": true,
        "tag": ["test"],
        "metadata": {
            "ticket_id": "TEST-002",
            "requested_by": "Test User",
            "environment": "development"
        }
    })
}

/// Minimal allow rule with no description or metadata.
pub fn allow_web_rule() -> Value {
    json!({
        "rule_name": "Allow-Web",
        "source_zone": ["trust"],
        "destination_zone": ["untrust"],
        "source_address": ["10.0.0.5"],
        "destination_address": ["8.8.8.8"],
        "action": "allow",
        "service": ["tcp-80"]
    })
}

/// Decodes a document that is known to be well-typed.
pub fn rule(document: &Value) -> FirewallRule {
    FirewallRule::from_value(document).unwrap()
}

/// Default policy without the description and ticket id requirements.
pub fn relaxed_policy() -> PolicyConfig {
    let mut policy = PolicyConfig::default();
    policy.security.require_description = false;
    policy.security.require_ticket_id = false;
    policy
}
