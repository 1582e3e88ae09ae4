//! XML API request encoding
//!
//! Every PAN-OS XML API call is a `GET https://<host>/api/?...` with
//! form-encoded parameters. Requests are built by typed constructors and
//! only turned into text at the edge.

use crate::core::rule::{FirewallRule, Position};
use std::fmt::Write as _;

/// Device entry used by single-firewall configurations
pub const LOCAL_DEVICE: &str = "localhost.localdomain";

/// Default virtual system
pub const DEFAULT_VSYS: &str = "vsys1";

/// Parameters whose values never appear in logs or dry-run output
const SECRET_PARAMS: [&str; 2] = ["key", "password"];

const REDACTED: &str = "********";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RequestType {
    Keygen,
    Op,
    Config,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ConfigAction {
    Get,
    Set,
    Move,
}

/// One XML API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    request_type: RequestType,
    params: Vec<(&'static str, String)>,
}

impl ApiRequest {
    fn new(request_type: RequestType) -> Self {
        Self {
            request_type,
            params: vec![("type", request_type.to_string())],
        }
    }

    fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Exchanges credentials for an API key.
    pub fn keygen(user: &str, password: &str) -> Self {
        Self::new(RequestType::Keygen)
            .param("user", user)
            .param("password", password)
    }

    /// Operational command, `cmd` is an XML fragment.
    pub fn op(cmd: impl Into<String>) -> Self {
        Self::new(RequestType::Op).param("cmd", cmd)
    }

    pub fn system_info() -> Self {
        Self::op("<show><system><info></info></system></show>")
    }

    pub fn job_status(job_id: &str) -> Self {
        Self::op(format!(
            "<show><jobs><id>{}</id></jobs></show>",
            escape_xml(job_id)
        ))
    }

    pub fn config_get(xpath: impl Into<String>) -> Self {
        Self::new(RequestType::Config)
            .param("action", ConfigAction::Get.as_ref())
            .param("xpath", xpath)
    }

    pub fn config_set(xpath: impl Into<String>, element: impl Into<String>) -> Self {
        Self::new(RequestType::Config)
            .param("action", ConfigAction::Set.as_ref())
            .param("xpath", xpath)
            .param("element", element)
    }

    /// Moves an existing rule to the top or bottom of its rulebase.
    pub fn move_rule(xpath: impl Into<String>, position: Position) -> Self {
        Self::new(RequestType::Config)
            .param("action", ConfigAction::Move.as_ref())
            .param("xpath", xpath)
            .param("where", position.as_ref())
    }

    pub fn commit(description: Option<&str>) -> Self {
        let cmd = match description {
            Some(description) => format!(
                "<commit><description>{}</description></commit>",
                escape_xml(description)
            ),
            None => "<commit></commit>".to_string(),
        };
        Self::new(RequestType::Commit).param("cmd", cmd)
    }

    /// Attaches the API key. Keygen requests authenticate with credentials
    /// instead and are returned unchanged.
    pub fn with_key(self, key: &str) -> Self {
        if self.request_type == RequestType::Keygen {
            self
        } else {
            self.param("key", key)
        }
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `application/x-www-form-urlencoded` parameters, in insertion order.
    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }

    pub fn url(&self, host: &str) -> String {
        format!("https://{host}/api/?{}", self.query_string())
    }

    /// Query string with secrets masked, safe to log.
    pub fn redacted(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter().map(|(k, v)| {
                if SECRET_PARAMS.contains(k) {
                    (*k, REDACTED)
                } else {
                    (*k, v.as_str())
                }
            }))
            .finish()
    }
}

/// Escapes the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// XPath of a security rule entry in `vsys`.
pub fn rule_xpath(vsys: &str, rule_name: &str) -> String {
    format!(
        "/config/devices/entry[@name='{LOCAL_DEVICE}']/vsys/entry[@name='{vsys}']/rulebase/security/rules/entry[@name='{rule_name}']"
    )
}

fn push_members(out: &mut String, name: &str, values: &[String]) {
    let _ = write!(out, "<{name}>");
    if values.is_empty() {
        out.push_str("<member>any</member>");
    }
    for value in values {
        let _ = write!(out, "<member>{}</member>", escape_xml(value));
    }
    let _ = write!(out, "</{name}>");
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Body of a rule `entry` for a `config set` call.
pub fn rule_element(rule: &FirewallRule) -> String {
    let mut out = String::new();

    if !rule.description_text().is_empty() {
        let _ = write!(
            out,
            "<description>{}</description>",
            escape_xml(rule.description_text())
        );
    }

    push_members(&mut out, "from", &rule.source_zone);
    push_members(&mut out, "to", &rule.destination_zone);
    push_members(&mut out, "source", &rule.source_address);
    push_members(&mut out, "destination", &rule.destination_address);
    push_members(&mut out, "source-user", &rule.source_user);
    push_members(&mut out, "category", &rule.category);
    push_members(&mut out, "application", &rule.application);
    push_members(&mut out, "service", &rule.effective_services());

    let action = match rule.action() {
        Some(action) => action.to_string(),
        None if rule.action.trim().is_empty() => "deny".to_string(),
        None => rule.action.trim().to_string(),
    };
    let _ = write!(out, "<action>{}</action>", escape_xml(&action));
    let _ = write!(out, "<log-start>{}</log-start>", yes_no(rule.log_at_session_start));
    let _ = write!(out, "<log-end>{}</log-end>", yes_no(rule.log_at_session_end));

    if let Some(profile) = rule.log_forwarding.as_deref().filter(|p| !p.is_empty()) {
        let _ = write!(out, "<log-setting>{}</log-setting>", escape_xml(profile));
    }
    if let Some(group) = rule.group_profile.as_deref().filter(|g| !g.is_empty()) {
        let _ = write!(
            out,
            "<profile-setting><group><member>{}</member></group></profile-setting>",
            escape_xml(group)
        );
    }
    if !rule.tag.is_empty() {
        push_members(&mut out, "tag", &rule.tag);
    }
    if rule.disabled {
        out.push_str("<disabled>yes</disabled>");
    }
    if rule.negate_source {
        out.push_str("<negate-source>yes</negate-source>");
    }
    if rule.negate_destination {
        out.push_str("<negate-destination>yes</negate-destination>");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::{rule, sample_allow_rule};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"a & b < c > d "e" 'f'"#),
            "a &amp; b &lt; c &gt; d &quot;e&quot; &apos;f&apos;"
        );
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn test_rule_xpath() {
        assert_eq!(
            rule_xpath("vsys1", "Allow-Web"),
            "/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/rulebase/security/rules/entry[@name='Allow-Web']"
        );
    }

    #[test]
    fn test_rule_element_full() {
        let element = rule_element(&rule(&sample_allow_rule()));
        assert_eq!(
            element,
            "<description>Test allow rule for unit testing</description>\
             <from><member>trust</member></from>\
             <to><member>untrust</member></to>\
             <source><member>192.168.1.0/24</member></source>\
             <destination><member>10.0.0.1</member></destination>\
             <source-user><member>any</member></source-user>\
             <category><member>any</member></category>\
             <application><member>web-browsing</member></application>\
             <service><member>tcp-80</member></service>\
             <action>allow</action>\
             <log-start>yes</log-start>\
             <log-end>yes</log-end>\
             <tag><member>test</member></tag>"
        );
    }

    #[test]
    fn test_rule_element_defaults_and_flags() {
        let element = rule_element(&rule(&json!({
            "rule_name": "R",
            "description": "Web <prod> & \"friends\"",
            "log_at_session_start": false,
            "log_forwarding": "default",
            "group_profile": "strict",
            "disabled": true,
            "negate_source": true,
            "negate_destination": true
        })));

        assert!(element.starts_with(
            "<description>Web &lt;prod&gt; &amp; &quot;friends&quot;</description><from><member>any</member></from>"
        ));
        assert!(element.contains("<service><member>application-default</member></service>"));
        assert!(element.contains("<action>deny</action>"));
        assert!(element.contains("<log-start>no</log-start><log-end>yes</log-end>"));
        assert!(element.contains("<log-setting>default</log-setting>"));
        assert!(element.contains(
            "<profile-setting><group><member>strict</member></group></profile-setting>"
        ));
        assert!(element.ends_with(
            "<disabled>yes</disabled><negate-source>yes</negate-source><negate-destination>yes</negate-destination>"
        ));
        assert!(!element.contains("<tag>"));
    }

    #[test]
    fn test_member_values_escaped() {
        let element = rule_element(&rule(&json!({"source_address": ["o'brien&co"]})));
        assert!(element.contains("<source><member>o&apos;brien&amp;co</member></source>"));
    }

    #[test]
    fn test_action_normalized() {
        let element = rule_element(&rule(&json!({"action": "Reset-Both"})));
        assert!(element.contains("<action>reset-both</action>"));
    }

    #[test]
    fn test_query_string_encoding() {
        let request = ApiRequest::system_info().with_key("K=1&2");
        assert_eq!(
            request.query_string(),
            "type=op&cmd=%3Cshow%3E%3Csystem%3E%3Cinfo%3E%3C%2Finfo%3E%3C%2Fsystem%3E%3C%2Fshow%3E&key=K%3D1%262"
        );
        assert!(request.url("fw.example.net").starts_with("https://fw.example.net/api/?type=op&cmd="));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let keygen = ApiRequest::keygen("admin", "hunter2");
        assert_eq!(keygen.redacted(), "type=keygen&user=admin&password=********");
        assert_eq!(keygen.clone().with_key("abc"), keygen);

        let get = ApiRequest::config_get("/config").with_key("secret-key");
        assert!(!get.redacted().contains("secret-key"));
        assert_eq!(get.get("key"), Some("secret-key"));
    }

    #[test]
    fn test_commit_request() {
        let commit = ApiRequest::commit(Some("Deploy <Allow-Web>"));
        assert_eq!(commit.request_type(), RequestType::Commit);
        assert_eq!(
            commit.get("cmd"),
            Some("<commit><description>Deploy &lt;Allow-Web&gt;</description></commit>")
        );
        assert_eq!(
            ApiRequest::commit(None).get("cmd"),
            Some("<commit></commit>")
        );
    }

    #[test]
    fn test_job_status_and_move() {
        assert_eq!(
            ApiRequest::job_status("42").get("cmd"),
            Some("<show><jobs><id>42</id></jobs></show>")
        );

        let moved = ApiRequest::move_rule("/x", Position::Top);
        assert_eq!(moved.get("action"), Some("move"));
        assert_eq!(moved.get("where"), Some("top"));
    }

    #[test]
    fn test_config_set_params() {
        let request = ApiRequest::config_set("/x", "<a/>");
        let names: Vec<&str> = request.params().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["type", "action", "xpath", "element"]);
        assert_eq!(request.get("type"), Some("config"));
    }
}
