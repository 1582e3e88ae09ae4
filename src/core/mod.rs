//! Rule validation core
//!
//! - [`rule`]: the rule record and its enumerated fields
//! - [`report`]: categorized findings
//! - [`schema`]: structural validation against the rule JSON Schema
//! - [`network`]: addressing, zone and service checks
//! - [`security`]: organizational policy checks
//! - [`ruleset`]: rule-file discovery, per-file outcomes and duplicate names
//! - [`deploy_report`]: markdown deployment report
//! - [`error`]: error type for everything around the validators

pub mod deploy_report;
pub mod error;
pub mod network;
pub mod report;
pub mod rule;
pub mod ruleset;
pub mod schema;
pub mod security;

#[cfg(test)]
pub mod test_helpers;
