//! Rule file sets
//!
//! A rule set is the `*.json` content of one directory. Each file is read,
//! hashed and validated on its own; the only cross-file check is rule name
//! uniqueness.

use crate::config::PolicyConfig;
use crate::core::error::{Error, Result};
use crate::core::report::ValidationReport;
use crate::core::rule::FirewallRule;
use crate::core::schema::SchemaValidator;
use crate::core::{network, security};
use crate::validators::validate_rule_name;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name fragments that mark a file as a non-rule (lower-cased match)
pub const EXCLUDED_PATTERNS: [&str; 5] = ["template", "example", "sample", ".bak", ".backup"];

/// A single validation pass
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Check {
    Schema,
    Naming,
    Network,
    Security,
}

impl Check {
    pub fn all() -> Vec<Check> {
        use strum::IntoEnumIterator;
        Check::iter().collect()
    }
}

pub fn is_excluded(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    EXCLUDED_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Lists the rule files of `dir`, sorted by path.
///
/// Template, example, sample and backup files are skipped unless
/// `include_all` is set.
///
/// # Async
/// Uses `tokio::fs` for non-blocking directory scanning.
pub async fn discover_rule_files(dir: &Path, include_all: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut skipped = 0usize;

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };

        if !name.ends_with(".json") || !entry.file_type().await?.is_file() {
            continue;
        }

        if !include_all && is_excluded(name) {
            skipped += 1;
            continue;
        }

        files.push(path);
    }

    if skipped > 0 {
        debug!("Excluding {skipped} template/example file(s)");
    }

    files.sort();
    Ok(files)
}

/// Findings of one check for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub check: Check,
    #[serde(flatten)]
    pub report: ValidationReport,
}

/// Everything known about one rule file after validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file: String,
    pub rule_name: Option<String>,
    pub sha256: String,
    /// Problems with the document as a whole (unreadable, not JSON, wrong types)
    pub document: ValidationReport,
    pub checks: Vec<CheckReport>,
}

impl FileOutcome {
    pub fn passed(&self) -> bool {
        self.document.passed() && self.checks.iter().all(|c| c.report.passed())
    }

    pub fn error_count(&self) -> usize {
        self.document.errors.len()
            + self
                .checks
                .iter()
                .map(|c| c.report.errors.len())
                .sum::<usize>()
    }

    pub fn warning_count(&self) -> usize {
        self.checks.iter().map(|c| c.report.warnings.len()).sum()
    }

    pub fn report(&self, check: Check) -> Option<&ValidationReport> {
        self.checks
            .iter()
            .find(|c| c.check == check)
            .map(|c| &c.report)
    }
}

/// Outcome of validating a whole set of files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSetOutcome {
    pub files: Vec<FileOutcome>,
    /// Cross-file findings (duplicate rule names)
    pub set: ValidationReport,
}

impl RuleSetOutcome {
    pub fn passed(&self) -> bool {
        self.set.passed() && self.files.iter().all(FileOutcome::passed)
    }

    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| !f.passed()).count()
    }

    pub fn error_count(&self) -> usize {
        self.set.errors.len() + self.files.iter().map(FileOutcome::error_count).sum::<usize>()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(FileOutcome::warning_count).sum()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Runs the selected checks over rule documents
pub struct RuleSetValidator<'a> {
    schema: &'a SchemaValidator,
    policy: &'a PolicyConfig,
    checks: Vec<Check>,
}

impl<'a> RuleSetValidator<'a> {
    pub fn new(schema: &'a SchemaValidator, policy: &'a PolicyConfig) -> Self {
        Self {
            schema,
            policy,
            checks: Check::all(),
        }
    }

    /// Restricts validation to `checks`, in the given order.
    pub fn with_checks(mut self, checks: Vec<Check>) -> Self {
        self.checks = checks;
        self
    }

    /// Validates one parsed rule document.
    pub fn validate_value(&self, document: &serde_json::Value) -> Vec<CheckReport> {
        let rule = FirewallRule::from_value(document);

        self.checks
            .iter()
            .map(|&check| {
                let report = match (check, &rule) {
                    (Check::Schema, _) => self.schema.check(document),
                    (_, Err(e)) => ValidationReport::with_error(e.root_message()),
                    (Check::Naming, Ok(rule)) => validate_rule_name(&rule.rule_name)
                        .err()
                        .map_or_else(ValidationReport::new, ValidationReport::with_error),
                    (Check::Network, Ok(rule)) => network::validate(rule, &self.policy.network),
                    (Check::Security, Ok(rule)) => {
                        security::validate(rule, &self.policy.security)
                    }
                };
                CheckReport { check, report }
            })
            .collect()
    }

    /// Validates raw file content. Never fails: unreadable documents become a
    /// single root-level error.
    pub fn validate_bytes(&self, file: &str, content: &[u8]) -> FileOutcome {
        let sha256 = sha256_hex(content);

        let document: serde_json::Value = match serde_json::from_slice(content) {
            Ok(document) => document,
            Err(e) => {
                return FileOutcome {
                    file: file.to_string(),
                    rule_name: None,
                    sha256,
                    document: ValidationReport::with_error(format!("Invalid JSON: {e}")),
                    checks: Vec::new(),
                };
            }
        };

        let rule_name = document
            .get("rule_name")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string);

        // A mistyped document still gets every structural finding; the
        // checks that need a decoded rule are skipped.
        if let Err(e) = FirewallRule::from_value(&document) {
            let checks = self
                .checks
                .iter()
                .filter(|&&check| check == Check::Schema)
                .map(|&check| CheckReport {
                    check,
                    report: self.schema.check(&document),
                })
                .collect();
            return FileOutcome {
                file: file.to_string(),
                rule_name,
                sha256,
                document: ValidationReport::with_error(e.root_message()),
                checks,
            };
        }

        FileOutcome {
            file: file.to_string(),
            rule_name,
            sha256,
            document: ValidationReport::new(),
            checks: self.validate_value(&document),
        }
    }

    /// Reads and validates one file.
    pub async fn validate_file(&self, path: &Path) -> FileOutcome {
        let file = path
            .file_name()
            .and_then(|s| s.to_str())
            .map_or_else(|| path.display().to_string(), ToString::to_string);

        match tokio::fs::read(path).await {
            Ok(content) => {
                let outcome = self.validate_bytes(&file, &content);
                debug!(
                    "{file}: {} error(s), {} warning(s)",
                    outcome.error_count(),
                    outcome.warning_count()
                );
                outcome
            }
            Err(e) => {
                warn!("Cannot read {}: {e}", path.display());
                FileOutcome {
                    file,
                    rule_name: None,
                    sha256: String::new(),
                    document: ValidationReport::with_error(format!("Cannot read file: {e}")),
                    checks: Vec::new(),
                }
            }
        }
    }

    /// Validates every file, then checks rule names for uniqueness.
    pub async fn validate_files(&self, paths: &[PathBuf]) -> RuleSetOutcome {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(self.validate_file(path).await);
        }

        let set = find_duplicate_names(&files);
        info!(
            "Validated {} file(s): {} failed",
            files.len(),
            files.iter().filter(|f| !f.passed()).count()
        );

        RuleSetOutcome { files, set }
    }
}

/// Reports each rule name used by more than one file, once per name.
pub fn find_duplicate_names(files: &[FileOutcome]) -> ValidationReport {
    let mut by_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for outcome in files {
        if let Some(name) = outcome.rule_name.as_deref() {
            by_name.entry(name).or_default().push(&outcome.file);
        }
    }

    let mut report = ValidationReport::new();
    for (name, owners) in by_name {
        if owners.len() > 1 {
            report.error(format!(
                "Duplicate rule name '{name}' in files: {}",
                owners.join(", ")
            ));
        }
    }
    report
}

/// Writes `rule` as pretty JSON to `<dir>/<rule_name>.json`.
///
/// The content goes to a temporary file in `dir` first and is renamed into
/// place, so readers never see a partial rule.
pub async fn write_rule_file(dir: &Path, rule: &FirewallRule) -> Result<PathBuf> {
    validate_rule_name(&rule.rule_name).map_err(|e| Error::validation("rule_name", e))?;
    if rule.rule_name.contains(['/', '\\']) {
        return Err(Error::validation(
            "rule_name",
            "Rule name cannot contain path separators",
        ));
    }

    let mut json = serde_json::to_string_pretty(rule)?;
    json.push('\n');

    let dir = dir.to_path_buf();
    let path = dir.join(format!("{}.json", rule.rule_name));
    let target = path.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        use std::io::Write;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| Error::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| Error::Internal(format!("rule writer task failed: {e}")))??;

    info!("Wrote rule file {}", path.display());
    Ok(path)
}
