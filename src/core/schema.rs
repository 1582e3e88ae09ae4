//! Structural validation against a JSON Schema (Draft 7)
//!
//! The bundled schema lives in `schemas/firewall-rule.schema.json` and is
//! compiled into the binary. A caller-supplied schema document replaces it
//! entirely.

use crate::core::error::{Error, Result};
use crate::core::report::ValidationReport;
use jsonschema::Validator;
use serde_json::Value;

/// Rule schema shipped with the crate
pub const BUNDLED_SCHEMA: &str = include_str!("../../schemas/firewall-rule.schema.json");

/// Path reported for violations of the document itself
pub const ROOT_PATH: &str = "root";

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// `root`, or path segments joined with ` -> ` (e.g. `source_zone -> 0`)
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.path, self.message)
    }
}

pub struct SchemaValidator {
    validator: Validator,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compiles the bundled rule schema.
    pub fn bundled() -> Result<Self> {
        Self::from_str(BUNDLED_SCHEMA)
    }

    /// Compiles a schema from its JSON text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(schema: &str) -> Result<Self> {
        let schema: Value = serde_json::from_str(schema)?;
        Self::new(&schema)
    }

    /// Compiles an already-parsed schema document with Draft 7 semantics.
    pub fn new(schema: &Value) -> Result<Self> {
        let validator = jsonschema::draft7::new(schema)
            .map_err(|e| Error::Schema(format!("schema compile failed: {e}")))?;
        Ok(Self { validator })
    }

    /// Collects every violation of `document`, in the order the schema
    /// reports them.
    ///
    /// A document that is not a JSON object yields exactly one violation at
    /// [`ROOT_PATH`].
    pub fn validate(&self, document: &Value) -> Vec<SchemaViolation> {
        if !document.is_object() {
            return vec![SchemaViolation {
                path: ROOT_PATH.to_string(),
                message: format!("{document} is not of type \"object\""),
            }];
        }

        self.validator
            .iter_errors(document)
            .map(|err| SchemaViolation {
                path: display_path(&err.instance_path.to_string()),
                message: err.to_string(),
            })
            .collect()
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        document.is_object() && self.validator.is_valid(document)
    }

    /// Runs the schema check and folds violations into a report.
    pub fn check(&self, document: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();
        for violation in self.validate(document) {
            report.error(violation.to_string());
        }
        report
    }
}

/// Converts a JSON pointer (`/source_zone/0`) to `source_zone -> 0`.
fn display_path(pointer: &str) -> String {
    if pointer.is_empty() || pointer == "/" {
        return ROOT_PATH.to_string();
    }

    pointer
        .trim_start_matches('/')
        .split('/')
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::{allow_web_rule, sample_allow_rule};
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::bundled().unwrap()
    }

    #[test]
    fn test_valid_rules_pass() {
        let validator = validator();
        assert!(validator.validate(&sample_allow_rule()).is_empty());
        assert!(validator.validate(&allow_web_rule()).is_empty());
        assert!(validator.is_valid(&allow_web_rule()));
    }

    #[test]
    fn test_missing_required_fields() {
        for field in [
            "rule_name",
            "source_zone",
            "destination_zone",
            "source_address",
            "destination_address",
            "action",
        ] {
            let mut rule = sample_allow_rule();
            rule.as_object_mut().unwrap().remove(field);

            let violations = validator().validate(&rule);
            assert_eq!(violations.len(), 1, "missing {field}");
            assert_eq!(violations[0].path, ROOT_PATH);
            assert!(violations[0].message.contains(field));
        }
    }

    #[test]
    fn test_all_actions_accepted() {
        let validator = validator();
        for action in ["allow", "deny", "drop", "reset-client", "reset-server", "reset-both"] {
            let mut rule = sample_allow_rule();
            rule["action"] = json!(action);
            assert!(validator.validate(&rule).is_empty(), "action {action}");
        }
    }

    #[test]
    fn test_invalid_action_reports_field() {
        let mut rule = sample_allow_rule();
        rule["action"] = json!("invalid_action");

        let violations = validator().validate(&rule);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "action");
    }

    #[test]
    fn test_empty_lists_fail() {
        let mut rule = sample_allow_rule();
        rule["source_zone"] = json!([]);
        rule["destination_address"] = json!([]);

        let paths: Vec<String> = validator()
            .validate(&rule)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert!(paths.contains(&"source_zone".to_string()));
        assert!(paths.contains(&"destination_address".to_string()));
    }

    #[test]
    fn test_nested_path() {
        let mut rule = sample_allow_rule();
        rule["source_zone"] = json!([42]);

        let violations = validator().validate(&rule);
        assert_eq!(violations[0].path, "source_zone -> 0");
    }

    #[test]
    fn test_collects_all_violations() {
        let rule = json!({"rule_name": "R1", "source_zone": ["trust"], "action": "maybe"});
        let violations = validator().validate(&rule);

        assert!(violations.len() >= 2);
        assert!(violations.iter().any(|v| v.path == "action"));
        assert!(violations.iter().any(|v| v.path == ROOT_PATH));
    }

    #[test]
    fn test_non_object_is_single_root_violation() {
        for document in [json!([]), json!("rule"), json!(null), json!(7)] {
            let violations = validator().validate(&document);
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].path, ROOT_PATH);
        }
    }

    #[test]
    fn test_rule_name_shape() {
        let mut rule = sample_allow_rule();
        rule["rule_name"] = json!("Bad Name");
        assert!(!validator().validate(&rule).is_empty());

        rule["rule_name"] = json!("a".repeat(64));
        assert!(!validator().validate(&rule).is_empty());
    }

    #[test]
    fn test_metadata_environment_enum() {
        let mut rule = sample_allow_rule();
        rule["metadata"]["environment"] = json!("qa");

        let violations = validator().validate(&rule);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "metadata -> environment");
    }

    #[test]
    fn test_custom_schema() {
        let validator = SchemaValidator::new(&json!({
            "type": "object",
            "required": ["rule_name"]
        }))
        .unwrap();
        assert!(validator.validate(&json!({"rule_name": "x"})).is_empty());
        assert_eq!(validator.validate(&json!({})).len(), 1);
    }

    #[test]
    fn test_broken_schema_is_error() {
        let err = SchemaValidator::new(&json!({"type": 12})).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(SchemaValidator::from_str("{").is_err());
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(""), "root");
        assert_eq!(display_path("/a/0/b"), "a -> 0 -> b");
        assert_eq!(display_path("/a~1b"), "a/b");
    }

    #[test]
    fn test_check_report() {
        let mut rule = sample_allow_rule();
        rule["action"] = json!("permit");
        let report = validator().check(&rule);
        assert!(!report.passed());
        assert!(report.errors[0].starts_with("[action]"));
    }
}
