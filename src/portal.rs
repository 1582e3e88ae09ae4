//! Self-service request tracking
//!
//! The request store is an explicit value owned by whoever handles form
//! submissions. Request ids come from a [`RequestCounter`] the caller owns,
//! so two stores never share hidden state.

use crate::core::error::{Error, Result};
use crate::core::rule::{FirewallRule, Position, RuleMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const FIREWALL_RULE_SERVICE_ID: &str = "palo_alto_firewall_rule";

/// Tags stamped on every rule generated from a form
pub const SELF_SERVICE_TAGS: [&str; 3] = ["gitops", "auto-deployed", "self-service"];

/// Service request id, displayed as `SR-<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SR-{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("SR-")
            .and_then(|n| n.parse().ok())
            .map(RequestId)
            .ok_or_else(|| Error::validation("request_id", format!("Invalid request id: {s}")))
    }
}

/// Monotonic id source
#[derive(Debug, Clone)]
pub struct RequestCounter {
    last: u64,
}

impl Default for RequestCounter {
    fn default() -> Self {
        Self::starting_after(1000)
    }
}

impl RequestCounter {
    /// The first id handed out is `last + 1`.
    pub fn starting_after(last: u64) -> Self {
        Self { last }
    }

    pub fn next_id(&mut self) -> RequestId {
        self.last += 1;
        RequestId(self.last)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum RequestStatus {
    #[default]
    Pending,
    #[strum(serialize = "Generating Rule Definition")]
    GeneratingRule,
    #[strum(serialize = "Committing to Git")]
    CommittingToGit,
    #[strum(serialize = "Deploying to Firewall")]
    DeployingToFirewall,
    #[strum(serialize = "Running Automation")]
    RunningAutomation,
    #[strum(serialize = "Completed - Pending CI/CD")]
    CompletedPendingCi,
    Completed,
    Failed,
}

impl RequestStatus {
    pub const fn is_finished(self) -> bool {
        matches!(
            self,
            RequestStatus::CompletedPendingCi | RequestStatus::Completed | RequestStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub service_id: String,
    pub service_name: String,
    pub requester: String,
    pub submitted_at: DateTime<Utc>,
    pub status: RequestStatus,
    /// Submitted form fields as entered
    pub details: serde_json::Map<String, serde_json::Value>,
    pub logs: Vec<LogEntry>,
}

impl ServiceRequest {
    pub fn new(
        id: RequestId,
        service_id: impl Into<String>,
        service_name: impl Into<String>,
        requester: impl Into<String>,
        details: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            id,
            service_id: service_id.into(),
            service_name: service_name.into(),
            requester: requester.into(),
            submitted_at: Utc::now(),
            status: RequestStatus::Pending,
            details,
            logs: Vec::new(),
        }
    }
}

/// Requests by id
#[derive(Debug, Clone, Default)]
pub struct RequestStore {
    requests: BTreeMap<RequestId, ServiceRequest>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request. Its id must be greater than every id already stored.
    pub fn insert(&mut self, request: ServiceRequest) -> Result<RequestId> {
        let id = request.id;
        if let Some((&newest, _)) = self.requests.last_key_value()
            && id <= newest
        {
            return Err(Error::validation(
                "request_id",
                format!("Request id {id} is not newer than {newest}"),
            ));
        }

        self.requests.insert(id, request);
        Ok(id)
    }

    pub fn get(&self, id: RequestId) -> Option<&ServiceRequest> {
        self.requests.get(&id)
    }

    /// All requests, newest first.
    pub fn list(&self) -> impl Iterator<Item = &ServiceRequest> {
        self.requests.values().rev()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn get_mut(&mut self, id: RequestId) -> Result<&mut ServiceRequest> {
        self.requests
            .get_mut(&id)
            .ok_or_else(|| Error::validation("request_id", format!("Unknown request {id}")))
    }

    pub fn set_status(&mut self, id: RequestId, status: RequestStatus) -> Result<()> {
        let request = self.get_mut(id)?;
        tracing::debug!("{id}: {} -> {status}", request.status);
        request.status = status;
        Ok(())
    }

    pub fn append_log(&mut self, id: RequestId, message: impl Into<String>) -> Result<()> {
        self.get_mut(id)?.logs.push(LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
        Ok(())
    }
}

/// How an endpoint was picked on the form
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EndpointType {
    /// Host picked from inventory, which lists addresses as `a.b.c.d/32`
    #[default]
    Vm,
    Ip,
    Subnet,
}

/// Firewall rule request as submitted through the portal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallRuleForm {
    pub rule_name: String,
    pub description: String,
    pub source_zone: String,
    pub destination_zone: String,
    pub source_type: EndpointType,
    pub source_vm: String,
    pub source_ip: String,
    pub source_subnet: String,
    pub destination_type: EndpointType,
    pub destination_vm: String,
    pub destination_ip: String,
    pub destination_subnet: String,
    /// Requested applications
    pub service: Vec<String>,
    pub action: String,
}

fn endpoint_address(kind: EndpointType, vm: &str, ip: &str, subnet: &str) -> String {
    let host = |value: &str| {
        value
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    };
    match kind {
        EndpointType::Vm => host(vm),
        EndpointType::Ip => host(ip),
        EndpointType::Subnet => subnet.trim().to_string(),
    }
}

impl FirewallRuleForm {
    pub fn source_address(&self) -> String {
        endpoint_address(
            self.source_type,
            &self.source_vm,
            &self.source_ip,
            &self.source_subnet,
        )
    }

    pub fn destination_address(&self) -> String {
        endpoint_address(
            self.destination_type,
            &self.destination_vm,
            &self.destination_ip,
            &self.destination_subnet,
        )
    }

    /// Registers this form as a new request in `store`.
    pub fn submit(
        &self,
        store: &mut RequestStore,
        counter: &mut RequestCounter,
        requester: &str,
    ) -> Result<RequestId> {
        let details = match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => map,
            _ => return Err(Error::Internal("form did not serialize to an object".into())),
        };

        let request = ServiceRequest::new(
            counter.next_id(),
            FIREWALL_RULE_SERVICE_ID,
            "Palo Alto Firewall Rule",
            requester,
            details,
        );
        store.insert(request)
    }

    /// Builds the rule file content for an accepted request.
    pub fn to_rule(&self, request: &ServiceRequest) -> FirewallRule {
        let mut extra = serde_json::Map::new();
        extra.insert("created_via".into(), "Self-Service Portal".into());
        extra.insert("request_id".into(), request.id.to_string().into());
        extra.insert("timestamp".into(), request.submitted_at.to_rfc3339().into());

        FirewallRule {
            rule_name: self.rule_name.trim().to_string(),
            description: Some(self.description.trim().to_string()).filter(|d| !d.is_empty()),
            source_zone: vec![self.source_zone.trim().to_string()],
            destination_zone: vec![self.destination_zone.trim().to_string()],
            source_address: vec![self.source_address()],
            destination_address: vec![self.destination_address()],
            application: self.service.clone(),
            service: vec!["application-default".to_string()],
            action: self.action.trim().to_string(),
            log_at_session_start: true,
            log_at_session_end: true,
            position: Some(Position::Top.to_string()),
            tag: SELF_SERVICE_TAGS.iter().map(ToString::to_string).collect(),
            metadata: RuleMetadata {
                requested_by: Some(request.requester.clone()),
                extra,
                ..RuleMetadata::default()
            },
            ..FirewallRule::default()
        }
    }
}
