//! Policy configuration
//!
//! The validators never read policy from disk themselves: callers load a
//! [`PolicyConfig`] once and pass it by reference. Every field has a
//! default, so a policy file only needs to list what it overrides:
//!
//! ```json
//! {
//!   "security": { "require_ticket_id": false, "max_addresses_per_rule": 20 },
//!   "network": { "valid_zones": ["trust", "untrust", "lab"] }
//! }
//! ```

use crate::core::error::Result;
use crate::utils::get_config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name looked up in the config directory when no path is given
pub const POLICY_FILE_NAME: &str = "policy.json";

/// Complete validation policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub network: NetworkPolicy,
    pub security: SecurityPolicy,
}

/// Addressing and zone policy consumed by the network validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkPolicy {
    /// Known zone names, compared case-insensitively
    pub valid_zones: Vec<String>,
    /// Address tokens that are legal but always worth a reviewer's attention
    pub warn_addresses: Vec<String>,
    /// Networks with a shorter prefix than this are reported as large
    pub large_network_prefix: u8,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            valid_zones: to_strings(&[
                "trust",
                "untrust",
                "dmz",
                "internal",
                "external",
                "management",
                "database",
                "web",
                "app",
            ]),
            warn_addresses: to_strings(&["0.0.0.0/0", "255.255.255.255", "::/0"]),
            large_network_prefix: 16,
        }
    }
}

impl NetworkPolicy {
    pub fn is_known_zone(&self, zone: &str) -> bool {
        zone.eq_ignore_ascii_case("any")
            || self
                .valid_zones
                .iter()
                .any(|known| known.eq_ignore_ascii_case(zone))
    }
}

/// Organizational policy consumed by the security validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    pub prohibited_sources: Vec<String>,
    pub high_risk_ports: Vec<String>,
    pub protected_zones: Vec<String>,
    pub restricted_applications: Vec<String>,
    /// Tags every `production` rule must carry
    pub required_tags_production: Vec<String>,
    pub max_addresses_per_rule: usize,
    pub require_logging: bool,
    pub require_description: bool,
    pub require_ticket_id: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            prohibited_sources: to_strings(&["0.0.0.0/0"]),
            high_risk_ports: to_strings(&[
                "tcp-22",    // SSH
                "tcp-23",    // Telnet
                "tcp-3389",  // RDP
                "tcp-1433",  // MSSQL
                "tcp-3306",  // MySQL
                "tcp-5432",  // PostgreSQL
                "tcp-27017", // MongoDB
            ]),
            protected_zones: to_strings(&["trust", "internal", "database", "management"]),
            restricted_applications: to_strings(&["unknown-tcp", "unknown-udp", "bittorrent", "tor"]),
            required_tags_production: Vec::new(),
            max_addresses_per_rule: 50,
            require_logging: true,
            require_description: true,
            require_ticket_id: true,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Default location of the policy file, if the platform has a config dir.
pub fn default_policy_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(POLICY_FILE_NAME))
}

/// Parses a policy document. Missing sections and fields take defaults.
pub fn parse_policy(json: &str) -> Result<PolicyConfig> {
    Ok(serde_json::from_str(json)?)
}

/// Loads the effective policy.
///
/// An explicit path must exist and parse. Without one, `policy.json` in the
/// config directory is used when present; otherwise the built-in defaults.
///
/// # Async
/// Uses `tokio::fs` for non-blocking I/O.
pub async fn load_policy(path: Option<&Path>) -> Result<PolicyConfig> {
    if let Some(path) = path {
        let json = tokio::fs::read_to_string(path).await?;
        info!("Loaded policy from {}", path.display());
        return parse_policy(&json);
    }

    if let Some(path) = default_policy_path()
        && tokio::fs::try_exists(&path).await.unwrap_or(false)
    {
        let json = tokio::fs::read_to_string(&path).await?;
        info!("Loaded policy from {}", path.display());
        return parse_policy(&json);
    }

    debug!("No policy file found, using built-in defaults");
    Ok(PolicyConfig::default())
}
