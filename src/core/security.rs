//! Organizational security policy checks
//!
//! Every check runs regardless of what earlier checks found. Most of them
//! only apply to `allow` rules; logging, description, ticket id and address
//! count limits apply to every rule.

use crate::config::SecurityPolicy;
use crate::core::report::ValidationReport;
use crate::core::rule::{Environment, FirewallRule};

/// Source zones treated as outside the organization
const UNTRUSTED_ZONES: [&str; 2] = ["untrust", "external"];

/// Minimum trimmed description length
pub const MIN_DESCRIPTION_LEN: usize = 10;

fn contains_any(list: &[String]) -> bool {
    list.iter().any(|item| item == "any")
}

fn contains_ignore_case(list: &[String], needle: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(needle))
}

/// Validates one rule against the security policy.
pub fn validate(rule: &FirewallRule, policy: &SecurityPolicy) -> ValidationReport {
    let mut report = ValidationReport::new();
    let allow = rule.action.trim().eq_ignore_ascii_case("allow");

    if allow {
        check_any_usage(&mut report, rule);
        check_source_addresses(&mut report, rule, policy);
        check_high_risk_ports(&mut report, rule, policy);
        check_zone_policies(&mut report, rule, policy);
        check_restricted_applications(&mut report, rule, policy);
    }

    check_logging(&mut report, rule, policy);
    check_description(&mut report, rule, policy);
    check_metadata(&mut report, rule, policy);
    check_address_limits(&mut report, rule, policy);
    check_production_tags(&mut report, rule, policy);

    report
}

fn check_any_usage(report: &mut ValidationReport, rule: &FirewallRule) {
    let any_source = contains_any(&rule.source_address);
    let any_destination = contains_any(&rule.destination_address);

    match (any_source, any_destination) {
        (true, true) => report
            .error("Allow rule with 'any' source AND 'any' destination is prohibited"),
        (true, false) => {
            report.warning("Allow rule with 'any' source - ensure this is intentional");
        }
        (false, true) => {
            report.warning("Allow rule with 'any' destination - ensure this is intentional");
        }
        (false, false) => {}
    }

    if contains_any(&rule.application) && contains_any(&rule.service) {
        report.warning("Allow rule permits any application and any service");
    }
}

fn check_source_addresses(
    report: &mut ValidationReport,
    rule: &FirewallRule,
    policy: &SecurityPolicy,
) {
    for addr in &rule.source_address {
        if policy.prohibited_sources.contains(addr) {
            report.error(format!("Prohibited source address: {addr}"));
        }
    }
}

fn check_high_risk_ports(
    report: &mut ValidationReport,
    rule: &FirewallRule,
    policy: &SecurityPolicy,
) {
    for service in &rule.service {
        if contains_ignore_case(&policy.high_risk_ports, service) {
            report.warning(format!(
                "High-risk port detected: {service} - ensure proper approval obtained"
            ));
        }
    }
}

fn check_zone_policies(
    report: &mut ValidationReport,
    rule: &FirewallRule,
    policy: &SecurityPolicy,
) {
    let from_untrusted = UNTRUSTED_ZONES
        .iter()
        .any(|zone| contains_ignore_case(&rule.source_zone, zone));
    if !from_untrusted {
        return;
    }

    for zone in &rule.destination_zone {
        if contains_ignore_case(&policy.protected_zones, zone) {
            report.warning(format!(
                "Rule allows traffic from untrust to protected zone '{zone}'"
            ));
        }
    }
}

fn check_restricted_applications(
    report: &mut ValidationReport,
    rule: &FirewallRule,
    policy: &SecurityPolicy,
) {
    for app in &rule.application {
        if contains_ignore_case(&policy.restricted_applications, app) {
            report.error(format!("Restricted application detected: {app}"));
        }
    }
}

fn check_logging(report: &mut ValidationReport, rule: &FirewallRule, policy: &SecurityPolicy) {
    if policy.require_logging && !rule.log_at_session_start && !rule.log_at_session_end {
        report.warning("Logging is not enabled for this rule");
    }
}

fn check_description(
    report: &mut ValidationReport,
    rule: &FirewallRule,
    policy: &SecurityPolicy,
) {
    if policy.require_description && rule.description_text().chars().count() < MIN_DESCRIPTION_LEN
    {
        report.warning(format!(
            "Rule should have a meaningful description (min {MIN_DESCRIPTION_LEN} characters)"
        ));
    }
}

fn check_metadata(report: &mut ValidationReport, rule: &FirewallRule, policy: &SecurityPolicy) {
    if policy.require_ticket_id && rule.metadata.ticket_id().is_none() {
        report.warning("Rule should have a ticket_id in metadata for audit purposes");
    }
}

fn check_address_limits(
    report: &mut ValidationReport,
    rule: &FirewallRule,
    policy: &SecurityPolicy,
) {
    let max = policy.max_addresses_per_rule;

    let source_count = rule.source_address.len();
    if source_count > max {
        report.warning(format!(
            "Rule has {source_count} source addresses (max recommended: {max})"
        ));
    }

    let destination_count = rule.destination_address.len();
    if destination_count > max {
        report.warning(format!(
            "Rule has {destination_count} destination addresses (max recommended: {max})"
        ));
    }
}

fn check_production_tags(
    report: &mut ValidationReport,
    rule: &FirewallRule,
    policy: &SecurityPolicy,
) {
    if rule.metadata.environment() != Some(Environment::Production) {
        return;
    }

    for tag in &policy.required_tags_production {
        if !rule.tag.contains(tag) {
            report.warning(format!("Production rule is missing required tag: {tag}"));
        }
    }
}
