//! Input validation for rule fields
//!
//! This module provides centralized validation for everything read from the
//! rule file before it can reach the control-plane. Rows failing validation
//! are skipped with a warning; nothing invalid is ever sent to the service.

use std::net::IpAddr;

use ipnetwork::IpNetwork;

/// Validates a security rule name.
///
/// NSG rule names must begin with a letter or number, end with a letter,
/// number or underscore, may contain only letters, numbers, underscores,
/// periods or hyphens, and are limited to 80 characters.
///
/// # Errors
///
/// Returns `Err` if the name violates any of those constraints.
pub fn validate_rule_name(input: &str) -> Result<String, String> {
    let name = input.trim();

    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.len() > 80 {
        return Err("name too long (max 80 characters)".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err("name contains invalid characters".to_string());
    }

    let first = name.chars().next().unwrap_or_default();
    if !first.is_ascii_alphanumeric() {
        return Err("name must begin with a letter or number".to_string());
    }
    let last = name.chars().next_back().unwrap_or_default();
    if !(last.is_ascii_alphanumeric() || last == '_') {
        return Err("name must end with a letter, number or underscore".to_string());
    }

    Ok(name.to_string())
}

/// Validates a rule priority against the NSG range (100-4096).
///
/// # Errors
///
/// Returns `Err` if the priority is out of range.
pub fn validate_priority(priority: i64) -> Result<u16, String> {
    if (100..=4096).contains(&priority) {
        Ok(u16::try_from(priority).expect("range-checked"))
    } else {
        Err("priority must be between 100 and 4096".to_string())
    }
}

/// Validates one address-prefix token.
///
/// Accepts the wildcard `*`, CIDR blocks, bare IP addresses (v4 or v6), and
/// service tags (`VirtualNetwork`, `Internet`, `Storage.WestUS`, ...).
///
/// # Errors
///
/// Returns `Err` if the token is none of those.
pub fn validate_prefix(token: &str) -> Result<(), String> {
    if token == "*" {
        return Ok(());
    }
    if token.parse::<IpNetwork>().is_ok() || token.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    // Service tags: letters then letters/digits, optionally dotted (regional tags)
    let is_service_tag = token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.');
    if is_service_tag {
        return Ok(());
    }

    Err(format!("'{token}' is not a CIDR, IP, service tag or *"))
}

/// Validates one port or port-range token.
///
/// Accepts the wildcard `*`, a single port (1-65535) or a dash-delimited
/// range with start <= end.
///
/// # Errors
///
/// Returns `Err` if the token is malformed or out of range.
pub fn validate_port_token(token: &str) -> Result<(), String> {
    if token == "*" {
        return Ok(());
    }

    if let Some((start, end)) = token.split_once('-') {
        let start = parse_port(start)?;
        let end = parse_port(end)?;
        if start > end {
            return Err(format!("range '{token}' has start greater than end"));
        }
        return Ok(());
    }

    parse_port(token).map(|_| ())
}

fn parse_port(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("'{s}' is not a port between 1 and 65535")),
        Ok(port) => Ok(port),
    }
}
