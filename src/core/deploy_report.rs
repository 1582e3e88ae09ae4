//! Markdown deployment report
//!
//! Summarizes the rules of a set for the deployment record: a summary table,
//! per-rule details, a traffic-flow sketch and a manual verification
//! checklist. Files that cannot be decoded still appear, marked `ERROR`.

use crate::core::rule::FirewallRule;
use crate::utils::{summarize_list, title_case};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// Addresses shown per side in the summary table
const SUMMARY_ADDRESSES: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportEntry {
    Rule { file: String, rule: Box<FirewallRule> },
    Broken { file: String, error: String },
}

impl ReportEntry {
    /// Decodes file content into an entry; decode failures become `Broken`.
    pub fn from_bytes(file: &str, content: &[u8]) -> Self {
        let decoded = serde_json::from_slice::<serde_json::Value>(content)
            .map_err(crate::core::error::Error::from)
            .and_then(|value| FirewallRule::from_value(&value));

        match decoded {
            Ok(rule) => ReportEntry::Rule {
                file: file.to_string(),
                rule: Box::new(rule),
            },
            Err(e) => ReportEntry::Broken {
                file: file.to_string(),
                error: e.root_message(),
            },
        }
    }

    fn rule(&self) -> Option<&FirewallRule> {
        match self {
            ReportEntry::Rule { rule, .. } => Some(rule.as_ref()),
            ReportEntry::Broken { .. } => None,
        }
    }
}

/// Reads every path into a report entry, in the given order.
pub async fn load_entries(paths: &[PathBuf]) -> Vec<ReportEntry> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let file = file_label(path);
        let entry = match tokio::fs::read(path).await {
            Ok(content) => ReportEntry::from_bytes(&file, &content),
            Err(e) => ReportEntry::Broken {
                file,
                error: e.to_string(),
            },
        };
        entries.push(entry);
    }
    entries
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map_or_else(|| path.display().to_string(), ToString::to_string)
}

#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub environment: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ReportEntry>,
}

fn first_or_unknown(items: &[String]) -> &str {
    items.first().map_or("?", String::as_str)
}

fn metadata_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DeploymentReport {
    pub fn new(environment: impl Into<String>, entries: Vec<ReportEntry>) -> Self {
        Self {
            environment: environment.into(),
            generated_at: Utc::now(),
            entries,
        }
    }

    fn rules(&self) -> impl Iterator<Item = &FirewallRule> {
        self.entries.iter().filter_map(ReportEntry::rule)
    }

    /// Renders the report as markdown.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timestamp = self.generated_at.format("%Y-%m-%d %H:%M:%S UTC");

        writeln!(out, "# Firewall Rule Deployment Report")?;
        writeln!(out)?;
        writeln!(out, "**Environment:** {}", self.environment.to_uppercase())?;
        writeln!(out, "**Deployment Time:** {timestamp}")?;
        writeln!(out, "**Total Rules:** {}", self.entries.len())?;
        writeln!(out)?;

        self.render_summary(out)?;
        self.render_details(out)?;
        self.render_traffic_flow(out)?;
        self.render_verification(out)?;

        writeln!(out, "---")?;
        writeln!(out)?;
        writeln!(out, "*Generated by rulegate*")?;
        write!(out, "*Timestamp: {timestamp}*")
    }
}

impl DeploymentReport {
    fn render_summary(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "## Deployment Summary")?;
        writeln!(out)?;
        writeln!(out, "| Rule Name | Action | Source | Destination | Status |")?;
        writeln!(out, "|-----------|--------|--------|-------------|--------|")?;

        for entry in &self.entries {
            match entry {
                ReportEntry::Broken { file, .. } => {
                    writeln!(out, "| {file} | - | - | - | ERROR |")?;
                }
                ReportEntry::Rule { rule, .. } => {
                    writeln!(
                        out,
                        "| {} | {} | {} | {} | DEPLOYED |",
                        rule.rule_name,
                        rule.action.to_uppercase(),
                        summarize_list(&rule.source_address, SUMMARY_ADDRESSES),
                        summarize_list(&rule.destination_address, SUMMARY_ADDRESSES),
                    )?;
                }
            }
        }
        writeln!(out)
    }

    fn render_details(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "## Rule Details")?;
        writeln!(out)?;

        for entry in &self.entries {
            let (file, rule) = match entry {
                ReportEntry::Broken { file, error } => {
                    writeln!(out, "### {file}")?;
                    writeln!(out, "**Error:** {error}")?;
                    writeln!(out)?;
                    continue;
                }
                ReportEntry::Rule { file, rule } => (file, rule),
            };

            writeln!(out, "### {}", rule.rule_name)?;
            writeln!(out)?;
            writeln!(out, "**File:** `{file}`")?;
            writeln!(out)?;

            if !rule.description_text().is_empty() {
                writeln!(out, "**Description:** {}", rule.description_text())?;
                writeln!(out)?;
            }

            writeln!(out, "| Property | Value |")?;
            writeln!(out, "|----------|-------|")?;
            writeln!(out, "| **Action** | {} |", rule.action.to_uppercase())?;
            writeln!(out, "| **Source Zone** | {} |", rule.source_zone.join(", "))?;
            writeln!(
                out,
                "| **Destination Zone** | {} |",
                rule.destination_zone.join(", ")
            )?;
            writeln!(
                out,
                "| **Source Address** | {} |",
                rule.source_address.join(", ")
            )?;
            writeln!(
                out,
                "| **Destination Address** | {} |",
                rule.destination_address.join(", ")
            )?;
            writeln!(out, "| **Application** | {} |", rule.application.join(", "))?;
            writeln!(
                out,
                "| **Service** | {} |",
                rule.effective_services().join(", ")
            )?;
            writeln!(out, "| **Log Start** | {} |", rule.log_at_session_start)?;
            writeln!(out, "| **Log End** | {} |", rule.log_at_session_end)?;
            if !rule.tag.is_empty() {
                writeln!(out, "| **Tags** | {} |", rule.tag.join(", "))?;
            }
            writeln!(out)?;

            self.render_metadata(out, rule)?;
        }
        Ok(())
    }

    #[allow(clippy::unused_self)]
    fn render_metadata(&self, out: &mut fmt::Formatter<'_>, rule: &FirewallRule) -> fmt::Result {
        let metadata = &rule.metadata;
        if metadata.is_empty() {
            return Ok(());
        }

        writeln!(out, "**Metadata:**")?;
        writeln!(out)?;
        let known = [
            ("ticket_id", &metadata.ticket_id),
            ("requested_by", &metadata.requested_by),
            ("environment", &metadata.environment),
        ];
        for (key, value) in known {
            if let Some(value) = value {
                writeln!(out, "- **{}:** {value}", title_case(key))?;
            }
        }
        for (key, value) in &metadata.extra {
            writeln!(out, "- **{}:** {}", title_case(key), metadata_value(value))?;
        }
        writeln!(out)
    }

    fn render_traffic_flow(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "## Traffic Flow Summary")?;
        writeln!(out)?;
        writeln!(out, "```")?;

        for rule in self.rules() {
            writeln!(out, "[{}]", rule.rule_name)?;
            writeln!(
                out,
                "  {} ({}) --> [{}] --> {} ({})",
                first_or_unknown(&rule.source_address),
                first_or_unknown(&rule.source_zone),
                rule.action.to_uppercase(),
                first_or_unknown(&rule.destination_address),
                first_or_unknown(&rule.destination_zone),
            )?;
            writeln!(out)?;
        }

        writeln!(out, "```")?;
        writeln!(out)
    }

    fn render_verification(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "## Verification Steps")?;
        writeln!(out)?;
        writeln!(out, "1. Log into the Palo Alto firewall web interface")?;
        writeln!(out, "2. Navigate to **Policies** > **Security**")?;
        writeln!(out, "3. Verify the following rules are present:")?;
        writeln!(out)?;
        for rule in self.rules() {
            writeln!(out, "   - [ ] `{}`", rule.rule_name)?;
        }
        writeln!(out)?;
        writeln!(out, "4. Check the traffic logs at **Monitor** > **Logs** > **Traffic**")?;
        writeln!(out, "5. Test connectivity from source to destination hosts")?;
        writeln!(out)
    }
}
