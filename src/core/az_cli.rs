//! Azure CLI transport for the control-plane interface
//!
//! Implements [`ControlPlane`] by shelling out to `az network nsg rule show`
//! and `az network nsg rule create`. Reads exchange JSON on stdout; writes
//! use `--output none` and report through the exit status. The `create`
//! subcommand is an idempotent upsert: issuing it against an existing rule
//! name overwrites that rule.
//!
//! # Environment Variables
//!
//! - `NSGSYNC_AZ_PATH`: path of the az binary to spawn instead of resolving
//!   `az` from `PATH`. Integration tests point this at a stub.

use tokio::process::Command;
use tracing::{debug, error};

use crate::config::Settings;
use crate::core::error::{Error, Result};
use crate::core::reconcile::ControlPlane;
use crate::core::rule::{CanonicalRule, OneOrMany, RemoteRule};

/// Control-plane adapter bound to one resource group + NSG scope
pub struct AzCli<'a> {
    settings: &'a Settings,
}

impl<'a> AzCli<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    fn az_binary() -> String {
        std::env::var("NSGSYNC_AZ_PATH").unwrap_or_else(|_| "az".to_string())
    }

    async fn run_az(args: &[String]) -> Result<std::process::Output> {
        debug!("spawning az {}", args.join(" "));
        let output = Command::new(Self::az_binary())
            .args(args)
            .output()
            .await
            .map_err(|e| {
                error!("failed to spawn az: {e}");
                Error::Internal(format!("failed to spawn az: {e}"))
            })?;
        Ok(output)
    }
}

/// Arguments for `az network nsg rule show` on one rule name
pub fn show_args(settings: &Settings, name: &str) -> Vec<String> {
    [
        "network",
        "nsg",
        "rule",
        "show",
        "--resource-group",
        settings.resource_group.as_str(),
        "--nsg-name",
        settings.nsg_name.as_str(),
        "--name",
        name,
        "--output",
        "json",
    ]
    .map(str::to_string)
    .to_vec()
}

/// Arguments for `az network nsg rule create` encoding every canonical field.
///
/// Exactly the populated singular/plural variant per axis is encoded. Address
/// axes have distinct singular and plural flags; the CLI only exposes plural
/// flags for port ranges, so both port variants map to those.
pub fn upsert_args(settings: &Settings, rule: &CanonicalRule) -> Vec<String> {
    let priority = rule.priority.to_string();
    let direction = rule.direction.to_string();
    let access = rule.access.to_string();
    let protocol = rule.protocol.to_string();

    let mut args: Vec<String> = [
        "network",
        "nsg",
        "rule",
        "create",
        "--resource-group",
        settings.resource_group.as_str(),
        "--nsg-name",
        settings.nsg_name.as_str(),
        "--name",
        rule.name.as_str(),
        "--priority",
        priority.as_str(),
        "--direction",
        direction.as_str(),
        "--access",
        access.as_str(),
        "--protocol",
        protocol.as_str(),
        "--output",
        "none",
    ]
    .map(str::to_string)
    .to_vec();

    push_axis(
        &mut args,
        "--source-address-prefix",
        "--source-address-prefixes",
        &rule.source_addresses,
    );
    push_axis(
        &mut args,
        "--destination-address-prefix",
        "--destination-address-prefixes",
        &rule.destination_addresses,
    );
    push_axis(
        &mut args,
        "--source-port-ranges",
        "--source-port-ranges",
        &rule.source_ports,
    );
    push_axis(
        &mut args,
        "--destination-port-ranges",
        "--destination-port-ranges",
        &rule.destination_ports,
    );

    args
}

fn push_axis(args: &mut Vec<String>, singular_flag: &str, plural_flag: &str, axis: &OneOrMany) {
    match axis {
        OneOrMany::One(value) => {
            args.push(singular_flag.to_string());
            args.push(value.clone());
        }
        OneOrMany::Many(values) => {
            args.push(plural_flag.to_string());
            args.extend(values.iter().cloned());
        }
    }
}

/// Whether a `show` failure means legitimate absence rather than an error
fn is_not_found(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("resourcenotfound")
        || lower.contains("notfound")
        || lower.contains("could not be found")
        || lower.contains("does not exist")
}

impl ControlPlane for AzCli<'_> {
    async fn fetch_rule(&self, name: &str) -> Result<Option<RemoteRule>> {
        let args = show_args(self.settings, name);
        let output = Self::run_az(&args).await?;

        if output.status.success() {
            let remote: RemoteRule = serde_json::from_slice(&output.stdout)?;
            Ok(Some(remote))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if is_not_found(&stderr) {
                debug!(rule = %name, "no existing rule");
                return Ok(None);
            }
            error!(rule = %name, "az show failed: {stderr}");
            Err(Error::AzCli {
                message: stderr.lines().next().unwrap_or("az show failed").to_string(),
                stderr: Some(stderr),
                exit_code: output.status.code(),
            })
        }
    }

    async fn upsert_rule(&self, rule: &CanonicalRule) -> Result<()> {
        let args = upsert_args(self.settings, rule);
        let output = Self::run_az(&args).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(rule = %rule.name, "az create failed: {stderr}");
            Err(Error::AzCli {
                message: stderr
                    .lines()
                    .next()
                    .unwrap_or("az create failed")
                    .to_string(),
                stderr: Some(stderr),
                exit_code: output.status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule::{Access, Direction, Protocol};

    fn settings() -> Settings {
        Settings {
            resource_group: "prod-rg".to_string(),
            nsg_name: "web-nsg".to_string(),
        }
    }

    fn canonical(source_ports: OneOrMany) -> CanonicalRule {
        CanonicalRule {
            name: "allow-ssh".to_string(),
            priority: 100,
            direction: Direction::Inbound,
            access: Access::Allow,
            protocol: Protocol::Tcp,
            source_addresses: OneOrMany::One("*".to_string()),
            destination_addresses: OneOrMany::Many(vec![
                "10.0.0.4".to_string(),
                "10.0.0.5".to_string(),
            ]),
            source_ports,
            destination_ports: OneOrMany::One("22".to_string()),
        }
    }

    #[test]
    fn test_show_args_scope_the_rule() {
        let args = show_args(&settings(), "allow-ssh");
        assert_eq!(args[..4], ["network", "nsg", "rule", "show"].map(String::from));
        assert!(args.windows(2).any(|w| w[0] == "--resource-group" && w[1] == "prod-rg"));
        assert!(args.windows(2).any(|w| w[0] == "--nsg-name" && w[1] == "web-nsg"));
        assert!(args.windows(2).any(|w| w[0] == "--name" && w[1] == "allow-ssh"));
        assert!(args.windows(2).any(|w| w[0] == "--output" && w[1] == "json"));
    }

    #[test]
    fn test_upsert_args_pick_singular_address_flag() {
        let args = upsert_args(&settings(), &canonical(OneOrMany::One("*".to_string())));
        assert!(args.windows(2).any(|w| w[0] == "--source-address-prefix" && w[1] == "*"));
        assert!(!args.contains(&"--source-address-prefixes".to_string()));
    }

    #[test]
    fn test_upsert_args_pick_plural_address_flag() {
        let args = upsert_args(&settings(), &canonical(OneOrMany::One("*".to_string())));
        let at = args
            .iter()
            .position(|a| a == "--destination-address-prefixes")
            .unwrap();
        assert_eq!(args[at + 1], "10.0.0.4");
        assert_eq!(args[at + 2], "10.0.0.5");
        assert!(!args.contains(&"--destination-address-prefix".to_string()));
    }

    #[test]
    fn test_upsert_args_port_axes_always_use_plural_flags() {
        let singular = upsert_args(&settings(), &canonical(OneOrMany::One("*".to_string())));
        assert!(singular.windows(2).any(|w| w[0] == "--source-port-ranges" && w[1] == "*"));

        let plural = upsert_args(
            &settings(),
            &canonical(OneOrMany::Many(vec!["80".to_string(), "443".to_string()])),
        );
        let at = plural.iter().position(|a| a == "--source-port-ranges").unwrap();
        assert_eq!(plural[at + 1], "80");
        assert_eq!(plural[at + 2], "443");
    }

    #[test]
    fn test_upsert_args_encode_scalars() {
        let args = upsert_args(&settings(), &canonical(OneOrMany::One("*".to_string())));
        assert!(args.windows(2).any(|w| w[0] == "--priority" && w[1] == "100"));
        assert!(args.windows(2).any(|w| w[0] == "--direction" && w[1] == "Inbound"));
        assert!(args.windows(2).any(|w| w[0] == "--access" && w[1] == "Allow"));
        assert!(args.windows(2).any(|w| w[0] == "--protocol" && w[1] == "Tcp"));
        assert!(args.windows(2).any(|w| w[0] == "--output" && w[1] == "none"));
    }

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found(
            "(ResourceNotFound) The Resource 'allow-ssh' under resource group 'prod-rg' was not found."
        ));
        assert!(is_not_found("Rule 'x' could not be found."));
        assert!(!is_not_found("(AuthorizationFailed) no authorization"));
    }
}
