//! rulegate - GitOps validation for Palo Alto Networks security rules
//!
//! Rules live in a repository as one JSON file each. Before a pipeline
//! deploys them, rulegate checks every file against the rule schema, the
//! network addressing rules and the organization's security policy.
//!
//! # Architecture
//!
//! - [`core`] - Rule model, the three validators, rule sets and reports
//! - [`validators`] - Token-level checks for names, addresses and services
//! - [`config`] - Policy configuration with built-in defaults
//! - [`panos`] - PAN-OS XML API request encoding and response decoding
//! - [`portal`] - Self-service request tracking and rule generation
//! - [`audit`] - Audit trail of CLI operations
//! - [`utils`] - Utility functions (XDG directories, etc.)
//!
//! # Example
//!
//! ```
//! use rulegate::config::PolicyConfig;
//! use rulegate::core::{network, rule::FirewallRule, security};
//!
//! let rule = FirewallRule::from_value(&serde_json::json!({
//!     "rule_name": "Allow-Web",
//!     "description": "Web access for the app tier",
//!     "source_zone": ["trust"],
//!     "destination_zone": ["untrust"],
//!     "source_address": ["10.0.0.5"],
//!     "destination_address": ["8.8.8.8"],
//!     "application": ["web-browsing"],
//!     "service": ["tcp-80"],
//!     "action": "allow",
//!     "metadata": {"ticket_id": "CHG-1"}
//! }))
//! .unwrap();
//!
//! let policy = PolicyConfig::default();
//! assert!(network::validate(&rule, &policy.network).passed());
//! assert!(security::validate(&rule, &policy.security).passed());
//! ```

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod panos;
pub mod portal;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use self::core::error::{Error, Result};
pub use self::core::report::ValidationReport;
pub use self::core::rule::FirewallRule;
