//! Validation results
//!
//! Every validator returns a [`ValidationReport`] with three independent,
//! ordered message lists. Only errors block deployment.

use serde::{Deserialize, Serialize};

/// Finding severity
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    /// Policy or structural violation, the rule must not be deployed
    Error,
    /// Advisory, a reviewer should see it
    Warning,
    /// Context such as address object references
    Info,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report holding a single error, used for documents that cannot be read.
    pub fn with_error(message: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.error(message);
        report
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.info.push(message.into());
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        match severity {
            Severity::Error => self.error(message),
            Severity::Warning => self.warning(message),
            Severity::Info => self.info(message),
        }
    }

    /// A rule passes iff it has no errors; warnings never change the outcome.
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// No findings of any severity.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.info.is_empty()
    }

    /// Appends another report's findings, keeping their order.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.info.extend(other.info);
    }

    pub fn messages(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Error => &self.errors,
            Severity::Warning => &self.warnings,
            Severity::Info => &self.info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_warnings_do_not_fail() {
        let mut report = ValidationReport::new();
        report.warning("Unknown source zone: lab");
        report.info("source uses address object: web-servers");
        assert!(report.passed());
        assert!(!report.is_clean());

        report.error("Invalid source address: 999.1.1.1");
        assert!(!report.passed());
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = ValidationReport::with_error("a");
        let mut second = ValidationReport::new();
        second.push(Severity::Error, "b");
        second.push(Severity::Warning, "c");
        first.merge(second);

        assert_eq!(first.errors, vec!["a", "b"]);
        assert_eq!(first.messages(Severity::Warning), ["c".to_string()]);
    }

    #[test]
    fn test_severity_display() {
        let labels: Vec<String> = Severity::iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, vec!["ERROR", "WARNING", "INFO"]);
    }
}
