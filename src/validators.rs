//! Token-level validation functions for rule fields
//!
//! The rule validators in [`crate::core`] are built from these classifiers.
//! They are pure, allocation-light and never panic on arbitrary input.

use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::core::rule::MAX_RULE_NAME_LEN;

/// Highest valid TCP/UDP/SCTP port
pub const MAX_PORT: u64 = 65_535;

/// Validates a rule name.
///
/// PAN-OS rule names must:
/// - Be non-empty and at most 63 characters
/// - Contain no whitespace
/// - Start with a letter
///
/// # Errors
///
/// Returns `Err` describing the first violated constraint.
///
/// # Examples
///
/// ```
/// use rulegate::validators::validate_rule_name;
///
/// assert!(validate_rule_name("Allow-Web").is_ok());
/// assert!(validate_rule_name("Bad Name").is_err());
/// assert!(validate_rule_name("1-rule").is_err());
/// ```
pub fn validate_rule_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Rule name cannot be empty".to_string());
    }

    if name.chars().count() > MAX_RULE_NAME_LEN {
        return Err(format!(
            "Rule name too long (max {MAX_RULE_NAME_LEN} characters)"
        ));
    }

    if name.chars().any(char::is_whitespace) {
        return Err(format!("Rule name cannot contain whitespace: '{name}'"));
    }

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(format!("Rule name must start with a letter: '{name}'"));
    }

    Ok(())
}

/// How an address token was understood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// `any` or `none`
    Keyword,
    /// Named address object configured on the firewall
    AddressObject,
    /// Literal IPv4/IPv6 host address
    IpAddress(IpAddr),
    /// CIDR network, host bits may be set
    Network(IpNetwork),
    Invalid,
}

impl AddressKind {
    pub const fn is_valid(&self) -> bool {
        !matches!(self, AddressKind::Invalid)
    }
}

/// Returns `true` for tokens shaped like an address object name.
///
/// Object names start with a letter and never contain `.`, `:` or `/`,
/// which keeps them disjoint from IP literals and networks.
pub fn is_address_object_name(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_alphabetic())
        && !token.contains(['.', ':', '/'])
}

/// Classifies an address token.
///
/// Tried in order: keyword, address object, IP literal, CIDR network.
///
/// # Examples
///
/// ```
/// use rulegate::validators::{classify_address, AddressKind};
///
/// assert_eq!(classify_address("ANY"), AddressKind::Keyword);
/// assert_eq!(classify_address("web-servers"), AddressKind::AddressObject);
/// assert!(matches!(classify_address("10.0.0.5"), AddressKind::IpAddress(_)));
/// assert!(matches!(classify_address("10.0.0.5/8"), AddressKind::Network(_)));
/// assert_eq!(classify_address("300.1.1.1"), AddressKind::Invalid);
/// ```
pub fn classify_address(token: &str) -> AddressKind {
    if token.eq_ignore_ascii_case("any") || token.eq_ignore_ascii_case("none") {
        return AddressKind::Keyword;
    }

    if is_address_object_name(token) {
        return AddressKind::AddressObject;
    }

    if let Some(ip) = parse_ip(token) {
        return AddressKind::IpAddress(ip);
    }

    parse_network(token).map_or(AddressKind::Invalid, AddressKind::Network)
}

/// Parses an IP literal. IPv6 literals may carry a zone (`fe80::1%eth0`),
/// which is dropped.
pub fn parse_ip(token: &str) -> Option<IpAddr> {
    match token.split_once('%') {
        Some((addr, zone)) if !zone.is_empty() => Ipv6Addr::from_str(addr).ok().map(IpAddr::V6),
        Some(_) => None,
        None => IpAddr::from_str(token).ok(),
    }
}

/// Parses `addr/prefix` (or `addr/netmask` and `addr/hostmask` for IPv4)
/// without requiring the host bits to be zero.
///
/// The address part must be a complete IP literal; shorthand such as
/// `10.1/16` is rejected.
pub fn parse_network(token: &str) -> Option<IpNetwork> {
    let (addr, prefix) = token.split_once('/')?;
    let addr = parse_ip(addr)?;

    let prefix = if prefix.bytes().all(|b| b.is_ascii_digit()) && !prefix.is_empty() {
        prefix.parse::<u8>().ok()?
    } else if addr.is_ipv4() {
        let mask = Ipv4Addr::from_str(prefix).ok()?;
        ipnetwork::ipv4_mask_to_prefix(mask)
            .or_else(|_| ipnetwork::ipv4_mask_to_prefix(!mask))
            .ok()?
    } else {
        return None;
    };

    IpNetwork::new(addr, prefix).ok()
}

/// Number of addresses covered by a network, as a decimal string.
///
/// IPv6 `/0` holds 2^128 addresses, one more than `u128` can represent.
pub fn network_size(network: &IpNetwork) -> String {
    let max_prefix: u32 = if network.is_ipv4() { 32 } else { 128 };
    let host_bits = max_prefix - u32::from(network.prefix());
    1u128
        .checked_shl(host_bits)
        .map_or_else(|| "340282366920938463463374607431768211456".to_string(), |n| n.to_string())
}

/// Transport protocol of a `<proto>-<port>` service token
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ServiceProtocol {
    Tcp,
    Udp,
    Sctp,
}

/// How a service token was understood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Any,
    ApplicationDefault,
    /// `<proto>-<port>` or `<proto>-<start>-<end>`; ports are unchecked and
    /// saturate at `u64::MAX`
    Ports {
        protocol: ServiceProtocol,
        start: u64,
        end: u64,
    },
    /// Named service object
    Named,
    Unusual,
}

/// Classifies a service token (case-insensitive).
///
/// # Examples
///
/// ```
/// use rulegate::validators::{classify_service, ServiceKind, ServiceProtocol};
///
/// assert_eq!(
///     classify_service("tcp-8000-8080"),
///     ServiceKind::Ports { protocol: ServiceProtocol::Tcp, start: 8000, end: 8080 }
/// );
/// assert_eq!(classify_service("application-default"), ServiceKind::ApplicationDefault);
/// assert_eq!(classify_service("service-https"), ServiceKind::Named);
/// assert_eq!(classify_service("tcp/80"), ServiceKind::Unusual);
/// ```
pub fn classify_service(token: &str) -> ServiceKind {
    if let Some(kind) = parse_port_service(token) {
        return kind;
    }

    if token.eq_ignore_ascii_case("any") {
        return ServiceKind::Any;
    }

    if token.eq_ignore_ascii_case("application-default") {
        return ServiceKind::ApplicationDefault;
    }

    if is_service_name(token) {
        ServiceKind::Named
    } else {
        ServiceKind::Unusual
    }
}

fn parse_port_service(token: &str) -> Option<ServiceKind> {
    let (protocol, ports) = token.split_once('-')?;
    let protocol = ServiceProtocol::from_str(protocol).ok()?;

    let (start, end) = match ports.split_once('-') {
        Some((start, end)) => (parse_port_digits(start)?, parse_port_digits(end)?),
        None => {
            let port = parse_port_digits(ports)?;
            (port, port)
        }
    };

    Some(ServiceKind::Ports {
        protocol,
        start,
        end,
    })
}

/// Parses a run of ASCII digits; values too large for `u64` saturate.
fn parse_port_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

fn is_service_name(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

/// Validates a single port number.
///
/// Port 0 is accepted: PAN-OS service objects may reference it.
///
/// # Errors
///
/// Returns `Err` if the port is above 65535.
pub fn validate_port(port: u64) -> Result<u16, String> {
    u16::try_from(port).map_err(|_| format!("Port {port} must be between 0 and {MAX_PORT}"))
}

/// Validates a port range.
///
/// # Errors
///
/// Returns `Err` if:
/// - Either port is above 65535
/// - Start port is greater than end port
pub fn validate_port_range(start: u64, end: u64) -> Result<(u16, u16), String> {
    let start = validate_port(start)?;
    let end = validate_port(end)?;

    if start > end {
        Err("Start port must be less than or equal to end port".to_string())
    } else {
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rule_name_valid() {
        assert!(validate_rule_name("Allow-Web").is_ok());
        assert!(validate_rule_name("a").is_ok());
        assert!(validate_rule_name("Rule_123.v2").is_ok());
        assert!(validate_rule_name(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_validate_rule_name_whitespace() {
        let err = validate_rule_name("Bad Name").unwrap_err();
        assert!(err.contains("whitespace"));
        assert!(validate_rule_name("Tab\tName").is_err());
    }

    #[test]
    fn test_validate_rule_name_other_failures() {
        assert!(validate_rule_name("").unwrap_err().contains("empty"));
        assert!(validate_rule_name(&"a".repeat(64)).unwrap_err().contains("too long"));
        assert!(validate_rule_name("9lives").unwrap_err().contains("letter"));
        assert!(validate_rule_name("-dash").is_err());
    }

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify_address("any"), AddressKind::Keyword);
        assert_eq!(classify_address("None"), AddressKind::Keyword);
    }

    #[test]
    fn test_classify_address_objects() {
        assert_eq!(classify_address("web-servers"), AddressKind::AddressObject);
        assert_eq!(classify_address("DB_Cluster_01"), AddressKind::AddressObject);
        // Dots push a token out of the object namespace
        assert_eq!(classify_address("host.example"), AddressKind::Invalid);
    }

    #[test]
    fn test_classify_ip_literals() {
        for ip in ["192.168.1.1", "10.0.0.1", "8.8.8.8", "::1", "2001:db8::1"] {
            assert!(
                matches!(classify_address(ip), AddressKind::IpAddress(_)),
                "{ip} should be an IP literal"
            );
        }
    }

    #[test]
    fn test_classify_networks() {
        for net in [
            "192.168.1.0/24",
            "10.0.0.0/8",
            "172.16.0.0/12",
            "10.0.0.5/8",
            "2001:db8::/32",
            "0.0.0.0/0",
            "::/0",
            "10.0.0.0/255.0.0.0",
        ] {
            assert!(
                matches!(classify_address(net), AddressKind::Network(_)),
                "{net} should be a network"
            );
        }
    }

    #[test]
    fn test_classify_invalid() {
        for token in [
            "256.1.1.1",
            "192.168.1",
            "10.0.0.0/33",
            "10.1/16",
            "2001:db8::/129",
            "_private",
            "",
            "10.0.0.0/",
        ] {
            assert_eq!(classify_address(token), AddressKind::Invalid, "{token}");
        }
    }

    #[test]
    fn test_netmask_prefix() {
        let net = parse_network("10.0.0.0/255.255.0.0").unwrap();
        assert_eq!(net.prefix(), 16);
        assert!(parse_network("10.0.0.0/255.0.255.0").is_none());
    }

    #[test]
    fn test_hostmask_prefix() {
        let net = parse_network("10.0.0.0/0.255.255.255").unwrap();
        assert_eq!(net.prefix(), 8);
        assert!(matches!(
            classify_address("10.0.0.0/0.0.255.255"),
            AddressKind::Network(n) if n.prefix() == 16
        ));
        assert!(parse_network("10.0.0.0/0.255.0.255").is_none());
    }

    #[test]
    fn test_scoped_ipv6_literals() {
        assert_eq!(
            classify_address("fe80::1%eth0"),
            AddressKind::IpAddress("fe80::1".parse().unwrap())
        );
        assert!(matches!(
            classify_address("fe80::%eth0/64"),
            AddressKind::Network(n) if n.prefix() == 64
        ));
        for token in ["fe80::1%", "10.0.0.1%eth0"] {
            assert_eq!(classify_address(token), AddressKind::Invalid, "{token}");
        }
    }

    #[test]
    fn test_network_size() {
        assert_eq!(network_size(&"10.0.0.0/8".parse().unwrap()), "16777216");
        assert_eq!(network_size(&"0.0.0.0/0".parse().unwrap()), "4294967296");
        assert_eq!(network_size(&"2001:db8::/127".parse().unwrap()), "2");
        assert_eq!(
            network_size(&"::/0".parse().unwrap()),
            "340282366920938463463374607431768211456"
        );
    }

    #[test]
    fn test_classify_service_ports() {
        assert_eq!(
            classify_service("tcp-80"),
            ServiceKind::Ports {
                protocol: ServiceProtocol::Tcp,
                start: 80,
                end: 80
            }
        );
        assert_eq!(
            classify_service("UDP-53"),
            ServiceKind::Ports {
                protocol: ServiceProtocol::Udp,
                start: 53,
                end: 53
            }
        );
        assert_eq!(
            classify_service("sctp-99999"),
            ServiceKind::Ports {
                protocol: ServiceProtocol::Sctp,
                start: 99_999,
                end: 99_999
            }
        );
    }

    #[test]
    fn test_classify_service_huge_port_saturates() {
        assert_eq!(
            classify_service("tcp-99999999999999999999999"),
            ServiceKind::Ports {
                protocol: ServiceProtocol::Tcp,
                start: u64::MAX,
                end: u64::MAX
            }
        );
    }

    #[test]
    fn test_classify_service_other_forms() {
        assert_eq!(classify_service("any"), ServiceKind::Any);
        assert_eq!(classify_service("ANY"), ServiceKind::Any);
        assert_eq!(
            classify_service("Application-Default"),
            ServiceKind::ApplicationDefault
        );
        assert_eq!(classify_service("service-http"), ServiceKind::Named);
        // Not a port form, but still a bare name
        assert_eq!(classify_service("icmp-8"), ServiceKind::Named);
        assert_eq!(classify_service("tcp-80-"), ServiceKind::Named);
        assert_eq!(classify_service("80/tcp"), ServiceKind::Unusual);
        assert_eq!(classify_service("tcp 80"), ServiceKind::Unusual);
    }

    #[test]
    fn test_validate_port() {
        assert_eq!(validate_port(0).unwrap(), 0);
        assert_eq!(validate_port(65_535).unwrap(), 65_535);
        assert!(validate_port(65_536).is_err());
    }

    #[test]
    fn test_validate_port_range() {
        assert_eq!(validate_port_range(80, 80).unwrap(), (80, 80));
        assert_eq!(validate_port_range(8000, 9000).unwrap(), (8000, 9000));
        assert!(validate_port_range(9000, 8000).is_err());
        assert!(validate_port_range(1, 70_000).is_err());
    }
}
