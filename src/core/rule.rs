//! Security rule data structures and normalization
//!
//! This module defines the core data structures for representing NSG security
//! rules and the normalization that makes desired and remote state comparable.
//!
//! # Rule Structure
//!
//! A [`RuleSpec`] is one desired rule as loaded from input: scalar match
//! criteria (priority, direction, access, protocol) plus four list-valued
//! axes (source/destination address prefixes and port ranges).
//!
//! A [`CanonicalRule`] is the shape the control-plane expects: each axis is
//! collapsed to either a singular value (one-element list) or a plural list
//! (more than one element). The [`OneOrMany`] sum type guarantees exactly one
//! of the two representations per axis.
//!
//! A [`RemoteRule`] is the control-plane's current record, deserialized from
//! `az network nsg rule show` JSON. The remote side may use singular or
//! plural field naming independent of the desired side's choice; equality is
//! defined so that representation and letter case never matter.

use serde::Deserialize;
use std::fmt;

use crate::core::error::{Error, Result};

/// Traffic direction of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Direction {
    /// Traffic arriving at the protected resources
    #[strum(serialize = "Inbound")]
    Inbound,
    /// Traffic leaving the protected resources
    #[strum(serialize = "Outbound")]
    Outbound,
}

/// Whether matching traffic is allowed or denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Access {
    #[strum(serialize = "Allow")]
    Allow,
    #[strum(serialize = "Deny")]
    Deny,
}

/// Network protocol matched by a rule
///
/// The variants mirror what the NSG API accepts. `Any` renders as the
/// wildcard `*` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Protocol {
    /// Match all protocols
    #[strum(to_string = "*", serialize = "any")]
    Any,
    #[strum(serialize = "Tcp")]
    Tcp,
    #[strum(serialize = "Udp")]
    Udp,
    #[strum(serialize = "Icmp")]
    Icmp,
    #[strum(serialize = "Esp")]
    Esp,
    #[strum(serialize = "Ah")]
    Ah,
}

/// One axis of address prefixes or port ranges, collapsed per the
/// control-plane's singular/plural field convention.
///
/// Exactly one representation exists per axis: a one-element input list
/// becomes [`OneOrMany::One`], anything longer becomes [`OneOrMany::Many`].
/// The empty list is not representable; [`OneOrMany::from_tokens`] rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Collapses a token list into the singular or plural representation.
    /// Returns `None` for an empty list.
    pub fn from_tokens(mut tokens: Vec<String>) -> Option<Self> {
        match tokens.len() {
            0 => None,
            1 => Some(OneOrMany::One(tokens.remove(0))),
            _ => Some(OneOrMany::Many(tokens)),
        }
    }

    /// The values of this axis in input order, singular as a one-element slice.
    pub fn values(&self) -> &[String] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }

    /// Comparison form: lower-cased and sorted, per the equality relation.
    pub fn normalized(&self) -> Vec<String> {
        normalize_values(self.values())
    }
}

impl fmt::Display for OneOrMany {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values().join(" "))
    }
}

/// Lower-cases every element and sorts the result.
///
/// This is the normalization applied to both sides of every comparison:
/// element order and letter case never influence equality.
pub fn normalize_values(values: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
    normalized.sort();
    normalized
}

/// One desired rule as loaded from a row of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    /// Rule name, the unique key within the NSG
    pub name: String,
    /// Evaluation priority, 100-4096, unique per direction
    pub priority: u16,
    pub direction: Direction,
    pub access: Access,
    pub protocol: Protocol,
    /// Address prefixes, in input order; the loader guarantees non-empty
    pub source_prefixes: Vec<String>,
    pub destination_prefixes: Vec<String>,
    /// Port or port-range tokens, in input order; the loader guarantees non-empty
    pub source_ports: Vec<String>,
    pub destination_ports: Vec<String>,
}

impl RuleSpec {
    /// Normalizes this spec into the canonical desired-state record, applying
    /// the singular/plural collapse independently to all four axes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any axis list is empty. The loader
    /// rejects such rows before they get here; this guards the invariant.
    pub fn canonicalize(&self) -> Result<CanonicalRule> {
        Ok(CanonicalRule {
            name: self.name.clone(),
            priority: self.priority,
            direction: self.direction,
            access: self.access,
            protocol: self.protocol,
            source_addresses: collapse_axis("source_prefixes", &self.source_prefixes)?,
            destination_addresses: collapse_axis(
                "destination_prefixes",
                &self.destination_prefixes,
            )?,
            source_ports: collapse_axis("source_ports", &self.source_ports)?,
            destination_ports: collapse_axis("destination_ports", &self.destination_ports)?,
        })
    }
}

fn collapse_axis(field: &str, tokens: &[String]) -> Result<OneOrMany> {
    OneOrMany::from_tokens(tokens.to_vec()).ok_or_else(|| Error::Validation {
        field: field.to_string(),
        message: "list must not be empty".to_string(),
    })
}

/// Canonical desired state for one rule, ready for command construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRule {
    pub name: String,
    pub priority: u16,
    pub direction: Direction,
    pub access: Access,
    pub protocol: Protocol,
    pub source_addresses: OneOrMany,
    pub destination_addresses: OneOrMany,
    pub source_ports: OneOrMany,
    pub destination_ports: OneOrMany,
}

impl CanonicalRule {
    /// Field-set equality against the control-plane's current record.
    ///
    /// Compares priority, direction, access, protocol and the four axes.
    /// Every field is normalized first (lists lower-cased and sorted, scalars
    /// lower-cased, absent fields as the empty list), so a remote rule stored
    /// with a singular field compares equal to a desired one-element plural
    /// list and vice versa.
    pub fn matches_remote(&self, remote: &RemoteRule) -> bool {
        remote.priority == Some(u32::from(self.priority))
            && scalar_matches(&self.direction.to_string(), remote.direction.as_deref())
            && scalar_matches(&self.access.to_string(), remote.access.as_deref())
            && scalar_matches(&self.protocol.to_string(), remote.protocol.as_deref())
            && self.source_addresses.normalized()
                == axis_values(
                    remote.source_address_prefix.as_ref(),
                    remote.source_address_prefixes.as_deref(),
                )
            && self.destination_addresses.normalized()
                == axis_values(
                    remote.destination_address_prefix.as_ref(),
                    remote.destination_address_prefixes.as_deref(),
                )
            && self.source_ports.normalized()
                == axis_values(
                    remote.source_port_range.as_ref(),
                    remote.source_port_ranges.as_deref(),
                )
            && self.destination_ports.normalized()
                == axis_values(
                    remote.destination_port_range.as_ref(),
                    remote.destination_port_ranges.as_deref(),
                )
    }
}

fn scalar_matches(desired: &str, remote: Option<&str>) -> bool {
    remote.is_some_and(|r| r.to_lowercase() == desired.to_lowercase())
}

/// Collects a remote axis into normalized comparison form, merging the
/// singular and plural fields (a well-formed record populates at most one).
fn axis_values(singular: Option<&String>, plural: Option<&[String]>) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    if let Some(value) = singular {
        values.push(value.clone());
    }
    if let Some(list) = plural {
        values.extend(list.iter().cloned());
    }
    normalize_values(&values)
}

/// The control-plane's current record for a rule name, as returned by
/// `az network nsg rule show --output json`.
///
/// Every field is optional: which of the singular/plural spellings appears
/// depends on how the rule was last written, and unrelated response fields
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteRule {
    pub name: Option<String>,
    pub priority: Option<u32>,
    pub direction: Option<String>,
    pub access: Option<String>,
    pub protocol: Option<String>,
    pub source_address_prefix: Option<String>,
    pub source_address_prefixes: Option<Vec<String>>,
    pub destination_address_prefix: Option<String>,
    pub destination_address_prefixes: Option<Vec<String>>,
    pub source_port_range: Option<String>,
    pub source_port_ranges: Option<Vec<String>>,
    pub destination_port_range: Option<String>,
    pub destination_port_ranges: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> RuleSpec {
        RuleSpec {
            name: name.to_string(),
            priority: 100,
            direction: Direction::Inbound,
            access: Access::Allow,
            protocol: Protocol::Tcp,
            source_prefixes: vec!["*".to_string()],
            destination_prefixes: vec!["10.0.0.4".to_string()],
            source_ports: vec!["*".to_string()],
            destination_ports: vec!["22".to_string()],
        }
    }

    #[test]
    fn test_one_element_list_collapses_to_singular() {
        let desired = spec("allow-ssh").canonicalize().unwrap();
        assert_eq!(desired.source_addresses, OneOrMany::One("*".to_string()));
        assert_eq!(
            desired.destination_addresses,
            OneOrMany::One("10.0.0.4".to_string())
        );
        assert_eq!(desired.destination_ports, OneOrMany::One("22".to_string()));
    }

    #[test]
    fn test_multi_element_list_collapses_to_plural() {
        let mut input = spec("allow-web");
        input.source_prefixes = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        let desired = input.canonicalize().unwrap();
        assert_eq!(
            desired.source_addresses,
            OneOrMany::Many(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()])
        );
    }

    #[test]
    fn test_empty_axis_is_a_validation_error() {
        let mut input = spec("broken");
        input.source_ports = vec![];
        let err = input.canonicalize().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "source_ports"));
    }

    #[test]
    fn test_normalize_sorts_and_lowercases() {
        let values = vec!["VirtualNetwork".to_string(), "internet".to_string()];
        assert_eq!(
            normalize_values(&values),
            vec!["internet".to_string(), "virtualnetwork".to_string()]
        );
    }

    #[test]
    fn test_equality_insensitive_to_singular_vs_plural() {
        let desired = spec("allow-ssh").canonicalize().unwrap();
        let remote = RemoteRule {
            priority: Some(100),
            direction: Some("Inbound".to_string()),
            access: Some("Allow".to_string()),
            protocol: Some("Tcp".to_string()),
            // Stored plural even though desired collapsed to singular
            source_address_prefixes: Some(vec!["*".to_string()]),
            destination_address_prefix: Some("10.0.0.4".to_string()),
            source_port_range: Some("*".to_string()),
            destination_port_ranges: Some(vec!["22".to_string()]),
            ..RemoteRule::default()
        };
        assert!(desired.matches_remote(&remote));
    }

    #[test]
    fn test_equality_insensitive_to_case() {
        let desired = spec("allow-ssh").canonicalize().unwrap();
        let remote = RemoteRule {
            priority: Some(100),
            direction: Some("inbound".to_string()),
            access: Some("ALLOW".to_string()),
            protocol: Some("tcp".to_string()),
            source_address_prefix: Some("*".to_string()),
            destination_address_prefix: Some("10.0.0.4".to_string()),
            source_port_range: Some("*".to_string()),
            destination_port_range: Some("22".to_string()),
            ..RemoteRule::default()
        };
        assert!(desired.matches_remote(&remote));
    }

    #[test]
    fn test_priority_difference_breaks_equality() {
        let desired = spec("allow-ssh").canonicalize().unwrap();
        let remote = RemoteRule {
            priority: Some(110),
            direction: Some("Inbound".to_string()),
            access: Some("Allow".to_string()),
            protocol: Some("Tcp".to_string()),
            source_address_prefix: Some("*".to_string()),
            destination_address_prefix: Some("10.0.0.4".to_string()),
            source_port_range: Some("*".to_string()),
            destination_port_range: Some("22".to_string()),
            ..RemoteRule::default()
        };
        assert!(!desired.matches_remote(&remote));
    }

    #[test]
    fn test_absent_remote_fields_break_equality() {
        let desired = spec("allow-ssh").canonicalize().unwrap();
        // A bare record (e.g. partially created rule) must not compare equal
        let remote = RemoteRule {
            priority: Some(100),
            ..RemoteRule::default()
        };
        assert!(!desired.matches_remote(&remote));
    }

    #[test]
    fn test_axis_order_does_not_matter() {
        let mut input = spec("allow-web");
        input.destination_ports = vec!["443".to_string(), "80".to_string()];
        let desired = input.canonicalize().unwrap();
        let remote = RemoteRule {
            priority: Some(100),
            direction: Some("Inbound".to_string()),
            access: Some("Allow".to_string()),
            protocol: Some("Tcp".to_string()),
            source_address_prefix: Some("*".to_string()),
            destination_address_prefix: Some("10.0.0.4".to_string()),
            source_port_range: Some("*".to_string()),
            destination_port_ranges: Some(vec!["80".to_string(), "443".to_string()]),
            ..RemoteRule::default()
        };
        assert!(desired.matches_remote(&remote));
    }

    #[test]
    fn test_remote_rule_deserializes_az_json() {
        let json = r#"{
            "name": "allow-ssh",
            "priority": 100,
            "direction": "Inbound",
            "access": "Allow",
            "protocol": "Tcp",
            "sourceAddressPrefix": "*",
            "sourceAddressPrefixes": [],
            "destinationAddressPrefix": "10.0.0.4",
            "destinationPortRange": "22",
            "sourcePortRange": "*",
            "provisioningState": "Succeeded",
            "etag": "W/\"00000000-0000-0000-0000-000000000000\""
        }"#;
        let remote: RemoteRule = serde_json::from_str(json).unwrap();
        assert_eq!(remote.priority, Some(100));
        assert_eq!(remote.source_address_prefix.as_deref(), Some("*"));
        assert_eq!(remote.source_address_prefixes.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_protocol_wildcard_round_trip() {
        assert_eq!(Protocol::Any.to_string(), "*");
        assert_eq!("*".parse::<Protocol>().unwrap(), Protocol::Any);
        assert_eq!("any".parse::<Protocol>().unwrap(), Protocol::Any);
        assert_eq!("TCP".parse::<Protocol>().unwrap(), Protocol::Tcp);
    }

    #[test]
    fn test_direction_parses_case_insensitively() {
        assert_eq!("inbound".parse::<Direction>().unwrap(), Direction::Inbound);
        assert_eq!(
            "OUTBOUND".parse::<Direction>().unwrap(),
            Direction::Outbound
        );
        assert!("sideways".parse::<Direction>().is_err());
    }
}
