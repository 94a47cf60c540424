//! nsgsync - declarative NSG rule synchronization
//!
//! Reads desired Azure network security group rules from a CSV file and
//! reconciles them against the live NSG, one rule at a time in input order.
//! Rules whose remote state already matches are skipped; the rest are
//! created or updated through the Azure CLI.
//!
//! # Usage
//!
//! ```bash
//! export RESOURCE_GROUP=prod-rg
//! export NSG_NAME=web-nsg
//! nsgsync rules.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: normal completion, even if individual rules failed to apply
//! - 1: usage error, missing configuration, or unreadable input file

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use nsgsync::core::az_cli::AzCli;
use nsgsync::core::error::AzCliErrorPattern;
use nsgsync::loader::{self, LoadedRow};
use nsgsync::{Outcome, Reconciler, Settings, audit};

#[derive(Parser)]
#[command(name = "nsgsync")]
#[command(about = "Synchronize declarative NSG rules from CSV", long_about = None)]
struct Cli {
    /// CSV file with the desired security rules
    rules: PathBuf,
}

fn main() -> ExitCode {
    // Log to stderr; stdout carries only the per-rule outcome report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let _ = nsgsync::utils::ensure_dirs();

    // Usage errors share exit code 1 with the other pre-flight failures,
    // so bypass clap's default exit-2 behavior.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    match runtime.block_on(run(&cli, &settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, settings: &Settings) -> nsgsync::Result<()> {
    let rows = loader::load_rules(&cli.rules)?;
    let az = AzCli::new(settings);
    let reconciler = Reconciler::new(&az);

    let mut applied = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    let mut invalid = 0usize;

    for row in rows {
        match row {
            LoadedRow::Skipped { name, reason } => {
                println!("⚠ Skipped row '{name}': {reason}");
                invalid += 1;
            }
            LoadedRow::Valid(spec) => match reconciler.reconcile(&spec).await {
                Outcome::Skipped => {
                    println!("✓ Skipped '{}': no changes", spec.name);
                    skipped += 1;
                }
                Outcome::Applied => {
                    println!("✓ Applied rule '{}'", spec.name);
                    audit::log_apply(&spec.name, spec.priority, true, None).await;
                    applied += 1;
                }
                Outcome::Failed(message) => {
                    println!("✗ Failed to apply rule '{}': {message}", spec.name);
                    let translation = AzCliErrorPattern::match_error(&message);
                    eprintln!("  {}", translation.user_message);
                    for suggestion in &translation.suggestions {
                        eprintln!("  hint: {suggestion}");
                    }
                    audit::log_apply(&spec.name, spec.priority, false, Some(message)).await;
                    failed += 1;
                }
            },
        }
    }

    println!("{applied} applied, {skipped} unchanged, {failed} failed, {invalid} rows skipped");
    audit::log_run(applied, skipped, failed, invalid).await;

    Ok(())
}
