//! Runtime configuration resolved once at startup
//!
//! The target scope (resource group + NSG name) comes from the environment,
//! is validated before any processing starts, and is passed by reference to
//! everything that needs it. There is no ambient global configuration.

use crate::core::error::{Error, Result};

/// Environment variable naming the Azure resource group
pub const RESOURCE_GROUP_VAR: &str = "RESOURCE_GROUP";

/// Environment variable naming the network security group
pub const NSG_NAME_VAR: &str = "NSG_NAME";

/// The fixed resource scope every control-plane call targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub resource_group: String,
    pub nsg_name: String,
}

impl Settings {
    /// Builds settings from `RESOURCE_GROUP` and `NSG_NAME`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either variable is unset or blank.
    /// This is a fatal pre-flight error; no rules are processed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(
            std::env::var(RESOURCE_GROUP_VAR).ok().as_deref(),
            std::env::var(NSG_NAME_VAR).ok().as_deref(),
        )
    }

    fn from_lookup(resource_group: Option<&str>, nsg_name: Option<&str>) -> Result<Self> {
        Ok(Self {
            resource_group: require(RESOURCE_GROUP_VAR, resource_group)?,
            nsg_name: require(NSG_NAME_VAR, nsg_name)?,
        })
    }
}

fn require(var: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::Configuration(format!("{var} is not set"))),
    }
}
