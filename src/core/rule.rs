//! Firewall rule records as stored in the GitOps repository
//!
//! A [`FirewallRule`] mirrors one JSON file under `firewall-rules/`. Every
//! field has a default so that validators can run on partially filled
//! documents; structural completeness is the schema validator's job.
//!
//! Enumerated fields (`action`, `position`, `metadata.environment`) keep the
//! raw document string and are parsed on demand. A rule with an unknown
//! action is still well-typed and still gets network and policy findings.
//!
//! # Example
//!
//! ```
//! use rulegate::core::rule::{Action, FirewallRule};
//!
//! let rule = FirewallRule::from_value(&serde_json::json!({
//!     "rule_name": "Allow-Web",
//!     "source_zone": ["trust"],
//!     "destination_zone": ["untrust"],
//!     "source_address": ["10.0.0.5"],
//!     "destination_address": ["8.8.8.8"],
//!     "action": "allow",
//!     "service": ["tcp-80"]
//! }))
//! .unwrap();
//!
//! assert_eq!(rule.action(), Some(Action::Allow));
//! assert!(rule.log_at_session_start);
//! assert_eq!(rule.application, vec!["any".to_string()]);
//! ```

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum rule name length accepted by PAN-OS
pub const MAX_RULE_NAME_LEN: usize = 63;

/// Rule action
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Action {
    Allow,
    Deny,
    Drop,
    ResetClient,
    ResetServer,
    ResetBoth,
}

impl Action {
    pub const fn is_allow(self) -> bool {
        matches!(self, Action::Allow)
    }
}

/// Placement of a rule in the security rulebase
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Position {
    Top,
    #[default]
    Bottom,
}

/// Deployment environment recorded in rule metadata
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    Production,
    Staging,
    Development,
    All,
}

/// Auditing fields attached to a rule
///
/// Unknown keys (`created_by`, `request_id`, ...) are kept in `extra` so a
/// rule written back to disk loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RuleMetadata {
    pub fn is_empty(&self) -> bool {
        self.ticket_id.is_none()
            && self.requested_by.is_none()
            && self.environment.is_none()
            && self.extra.is_empty()
    }

    /// Parsed environment, `None` when absent or not one of the known values.
    pub fn environment(&self) -> Option<Environment> {
        self.environment
            .as_deref()
            .and_then(|env| Environment::from_str(env).ok())
    }

    /// Ticket id with surrounding whitespace removed, `None` when blank.
    pub fn ticket_id(&self) -> Option<&str> {
        self.ticket_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A declarative security rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(default)]
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub source_zone: Vec<String>,
    #[serde(default)]
    pub destination_zone: Vec<String>,
    #[serde(default)]
    pub source_address: Vec<String>,
    #[serde(default)]
    pub destination_address: Vec<String>,
    #[serde(default = "default_any")]
    pub source_user: Vec<String>,
    #[serde(default = "default_any")]
    pub category: Vec<String>,
    #[serde(default = "default_any")]
    pub application: Vec<String>,
    /// Left empty when absent; deployment falls back to `application-default`
    #[serde(default)]
    pub service: Vec<String>,
    #[serde(default)]
    pub action: String,
    #[serde(default = "default_true")]
    pub log_at_session_start: bool,
    #[serde(default = "default_true")]
    pub log_at_session_end: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_forwarding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_profile: Option<String>,
    #[serde(default)]
    pub tag: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub negate_source: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub negate_destination: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "RuleMetadata::is_empty")]
    pub metadata: RuleMetadata,
}

fn default_any() -> Vec<String> {
    vec!["any".to_string()]
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl Default for FirewallRule {
    fn default() -> Self {
        Self {
            rule_name: String::new(),
            description: None,
            source_zone: Vec::new(),
            destination_zone: Vec::new(),
            source_address: Vec::new(),
            destination_address: Vec::new(),
            source_user: default_any(),
            category: default_any(),
            application: default_any(),
            service: Vec::new(),
            action: String::new(),
            log_at_session_start: true,
            log_at_session_end: true,
            log_forwarding: None,
            group_profile: None,
            tag: Vec::new(),
            disabled: false,
            negate_source: false,
            negate_destination: false,
            position: None,
            metadata: RuleMetadata::default(),
        }
    }
}

impl FirewallRule {
    /// Decodes a rule from an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the document is not a JSON object or a field has the
    /// wrong JSON type (e.g. a string where a list is expected).
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::validation(
                "root",
                "Rule document must be a JSON object",
            ));
        }
        Ok(Self::deserialize(value)?)
    }

    /// Parsed action, `None` when missing or not one of the six PAN-OS actions.
    pub fn action(&self) -> Option<Action> {
        Action::from_str(self.action.trim()).ok()
    }

    pub fn is_allow(&self) -> bool {
        self.action().is_some_and(Action::is_allow)
    }

    /// Rulebase placement, bottom unless the document asks for top.
    pub fn position(&self) -> Position {
        self.position
            .as_deref()
            .and_then(|p| Position::from_str(p).ok())
            .unwrap_or_default()
    }

    /// Services to deploy, `application-default` when none are listed.
    pub fn effective_services(&self) -> Vec<String> {
        if self.service.is_empty() {
            vec!["application-default".to_string()]
        } else {
            self.service.clone()
        }
    }

    /// Trimmed description, empty string when absent.
    pub fn description_text(&self) -> &str {
        self.description.as_deref().map_or("", str::trim)
    }
}
