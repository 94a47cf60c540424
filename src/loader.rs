//! CSV rule loading
//!
//! Consumes an ordered sequence of rows with named columns and turns each
//! into either a validated [`RuleSpec`] or a skip record carrying the reason.
//! Skips are per-row and non-fatal; only an unreadable file aborts the run.
//!
//! Expected columns: `name`, `priority`, `direction`, `access`, `protocol`,
//! `source_prefixes`, `destination_prefixes`, `source_ports`,
//! `destination_ports`. List-valued columns hold either the wildcard `*` or
//! tokens separated by commas and/or whitespace.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::core::error::Result;
use crate::core::rule::{Access, Direction, Protocol, RuleSpec};
use crate::validators;

/// One CSV row, flat strings suitable for spreadsheet editing
#[derive(Debug, Clone, Deserialize)]
struct RuleRow {
    name: String,
    priority: String,
    direction: String,
    access: String,
    protocol: String,
    source_prefixes: String,
    destination_prefixes: String,
    source_ports: String,
    destination_ports: String,
}

/// A row in input order: either a valid spec or a skip with its reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedRow {
    Valid(RuleSpec),
    Skipped { name: String, reason: String },
}

/// Loads every row of the rule file, in order.
///
/// # Errors
///
/// Returns `Err` only when the file cannot be opened or is not valid CSV;
/// individual malformed rows become [`LoadedRow::Skipped`].
pub fn load_rules(path: &Path) -> Result<Vec<LoadedRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();

    for record in reader.deserialize::<RuleRow>() {
        let row = record?;
        rows.push(convert_row(&row));
    }

    Ok(rows)
}

/// Splits a list-valued field into tokens.
///
/// A value equal to the single character `*` becomes the one-element wildcard
/// list; anything else is split on commas and/or whitespace into trimmed,
/// non-empty tokens, preserving order.
pub fn split_list(value: &str) -> Vec<String> {
    if value.trim() == "*" {
        return vec!["*".to_string()];
    }
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn convert_row(row: &RuleRow) -> LoadedRow {
    let skip = |reason: String| {
        warn!(rule = %row.name.trim(), "skipping row: {reason}");
        LoadedRow::Skipped {
            name: row.name.trim().to_string(),
            reason,
        }
    };

    // Check priority first so an otherwise-broken row still gets the
    // missing-priority warning rather than a downstream parse error.
    if row.priority.trim().is_empty() {
        return skip("missing priority".to_string());
    }

    let name = match validators::validate_rule_name(&row.name) {
        Ok(name) => name,
        Err(reason) => return skip(reason),
    };

    let priority = match row.priority.trim().parse::<i64>() {
        Ok(value) => match validators::validate_priority(value) {
            Ok(priority) => priority,
            Err(reason) => return skip(reason),
        },
        Err(_) => return skip(format!("priority '{}' is not a number", row.priority.trim())),
    };

    let direction = match row.direction.trim().parse::<Direction>() {
        Ok(direction) => direction,
        Err(_) => return skip(format!("unknown direction '{}'", row.direction.trim())),
    };
    let access = match row.access.trim().parse::<Access>() {
        Ok(access) => access,
        Err(_) => return skip(format!("unknown access '{}'", row.access.trim())),
    };
    let protocol = match row.protocol.trim().parse::<Protocol>() {
        Ok(protocol) => protocol,
        Err(_) => return skip(format!("unknown protocol '{}'", row.protocol.trim())),
    };

    let source_prefixes = match prefix_list("source_prefixes", &row.source_prefixes) {
        Ok(list) => list,
        Err(reason) => return skip(reason),
    };
    let destination_prefixes =
        match prefix_list("destination_prefixes", &row.destination_prefixes) {
            Ok(list) => list,
            Err(reason) => return skip(reason),
        };
    let source_ports = match port_list("source_ports", &row.source_ports) {
        Ok(list) => list,
        Err(reason) => return skip(reason),
    };
    let destination_ports = match port_list("destination_ports", &row.destination_ports) {
        Ok(list) => list,
        Err(reason) => return skip(reason),
    };

    LoadedRow::Valid(RuleSpec {
        name,
        priority,
        direction,
        access,
        protocol,
        source_prefixes,
        destination_prefixes,
        source_ports,
        destination_ports,
    })
}

fn prefix_list(field: &str, value: &str) -> std::result::Result<Vec<String>, String> {
    let tokens = split_list(value);
    if tokens.is_empty() {
        return Err(format!("{field} is empty"));
    }
    for token in &tokens {
        validators::validate_prefix(token).map_err(|e| format!("{field}: {e}"))?;
    }
    Ok(tokens)
}

fn port_list(field: &str, value: &str) -> std::result::Result<Vec<String>, String> {
    let tokens = split_list(value);
    if tokens.is_empty() {
        return Err(format!("{field} is empty"));
    }
    for token in &tokens {
        validators::validate_port_token(token).map_err(|e| format!("{field}: {e}"))?;
    }
    Ok(tokens)
}
