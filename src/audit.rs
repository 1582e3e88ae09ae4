/// Audit trail of CLI operations
///
/// Every validation run, dry-run and report generation is appended to a
/// JSON-lines file in the state directory so pipeline runs can be traced
/// back to the rule files they looked at.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Types of auditable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ValidateRules,
    DryRun,
    GenerateReport,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Identifies one CLI invocation
    pub run_id: Uuid,

    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    pub event_type: EventType,

    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if the operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(
        run_id: Uuid,
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            run_id,
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }
}

/// Audit log writer
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Opens the audit log in the state directory, creating the directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the state directory cannot be determined or created
    pub fn new() -> std::io::Result<Self> {
        let mut log_path = crate::utils::ensure_state_dir()?;
        log_path.push("audit.log");

        Ok(Self { log_path })
    }

    /// Audit log at an explicit location
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: path.into(),
        }
    }

    /// Appends an event as one JSON line.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be opened or written
    pub async fn log(&self, event: &AuditEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(event)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;

        Ok(())
    }

    /// Reads the most recent events, newest first. Unparseable lines are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be read
    pub async fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = tokio::fs::read_to_string(&self.log_path).await?;

        let events: Vec<AuditEvent> = content
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str(line).ok())
            .take(count)
            .collect();

        Ok(events)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

async fn record(event: AuditEvent) {
    match AuditLog::new() {
        Ok(audit) => {
            if let Err(e) = audit.log(&event).await {
                tracing::warn!("Failed to write audit log: {}", e);
            }
        }
        Err(e) => tracing::warn!("Audit log unavailable: {}", e),
    }
}

/// Logs a validation run over `files` rule files
pub async fn log_validate(
    run_id: Uuid,
    files: usize,
    errors: usize,
    warnings: usize,
    digests: serde_json::Value,
) {
    record(AuditEvent::new(
        run_id,
        EventType::ValidateRules,
        errors == 0,
        serde_json::json!({
            "files": files,
            "errors": errors,
            "warnings": warnings,
            "digests": digests,
        }),
        None,
    ))
    .await;
}

/// Logs a dry-run of one rule deployment
pub async fn log_dry_run(run_id: Uuid, rule_name: &str, steps: usize, error: Option<String>) {
    record(AuditEvent::new(
        run_id,
        EventType::DryRun,
        error.is_none(),
        serde_json::json!({
            "rule_name": rule_name,
            "steps": steps,
        }),
        error,
    ))
    .await;
}

/// Logs a deployment report generation
pub async fn log_report(run_id: Uuid, environment: &str, rules: usize, broken: usize) {
    record(AuditEvent::new(
        run_id,
        EventType::GenerateReport,
        broken == 0,
        serde_json::json!({
            "environment": environment,
            "rules": rules,
            "broken": broken,
        }),
        None,
    ))
    .await;
}
