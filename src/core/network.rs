//! Network addressing checks
//!
//! Looks at the address, zone and service tokens of a rule. Findings are
//! emitted in field order: source addresses, destination addresses, source
//! zones, destination zones, services.

use crate::config::NetworkPolicy;
use crate::core::report::ValidationReport;
use crate::core::rule::FirewallRule;
use crate::validators::{
    AddressKind, ServiceKind, classify_address, classify_service, network_size, validate_port,
};

/// Which side of the rule a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Source,
    Destination,
}

/// Validates the network configuration of one rule.
pub fn validate(rule: &FirewallRule, policy: &NetworkPolicy) -> ValidationReport {
    let mut report = ValidationReport::new();

    check_addresses(&mut report, &rule.source_address, Direction::Source, policy);
    check_addresses(
        &mut report,
        &rule.destination_address,
        Direction::Destination,
        policy,
    );
    check_zones(&mut report, &rule.source_zone, Direction::Source, policy);
    check_zones(
        &mut report,
        &rule.destination_zone,
        Direction::Destination,
        policy,
    );
    check_services(&mut report, &rule.service);

    report
}

fn check_addresses(
    report: &mut ValidationReport,
    addresses: &[String],
    direction: Direction,
    policy: &NetworkPolicy,
) {
    for addr in addresses {
        let kind = classify_address(addr);

        match kind {
            AddressKind::Invalid => {
                report.error(format!("Invalid {direction} address: {addr}"));
            }
            AddressKind::AddressObject => {
                report.info(format!("{direction} uses address object: {addr}"));
            }
            _ => {}
        }

        // Denylisted tokens warn whatever their classification
        if policy.warn_addresses.iter().any(|special| special == addr) {
            report.warning(format!("{direction} contains special address: {addr}"));
        }

        if let AddressKind::Network(network) = kind
            && network.prefix() < policy.large_network_prefix
        {
            report.warning(format!(
                "{direction} has large network ({} addresses): {addr}",
                network_size(&network)
            ));
        }
    }
}

fn check_zones(
    report: &mut ValidationReport,
    zones: &[String],
    direction: Direction,
    policy: &NetworkPolicy,
) {
    for zone in zones {
        if !policy.is_known_zone(zone) {
            report.warning(format!("Unknown {direction} zone: {zone}"));
        }
    }
}

fn check_services(report: &mut ValidationReport, services: &[String]) {
    for service in services {
        match classify_service(service) {
            ServiceKind::Unusual => {
                report.warning(format!("Unusual service format: {service}"));
            }
            ServiceKind::Ports { start, end, .. } => {
                if validate_port(start).is_err() || validate_port(end).is_err() {
                    report.error(format!("Invalid port number in service: {service}"));
                }
                if end < start {
                    report.error(format!("Invalid port range in service: {service}"));
                }
            }
            ServiceKind::Any | ServiceKind::ApplicationDefault | ServiceKind::Named => {}
        }
    }
}
