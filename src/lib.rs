//! nsgsync - declarative NSG rule synchronization
//!
//! Reconciles a CSV of desired Azure network security group rules against
//! the live NSG state, creating or updating only the rules that drifted.
//!
//! # Architecture
//!
//! - [`core`](crate::core) - Rule model, normalization, equality and the reconciler
//! - [`loader`] - CSV input parsing with per-row validation
//! - [`config`] - Target scope resolved once from the environment
//! - [`validators`] - Field validation (names, priorities, prefixes, ports)
//! - [`audit`] - JSON-lines audit trail of every write attempt
//! - [`utils`] - Utility functions (XDG directories)
//!
//! # Behavior
//!
//! - A rule whose remote state already matches is skipped without a write
//! - Equality ignores letter case, element order and the control-plane's
//!   singular-vs-plural field naming
//! - Malformed rows and failed writes are reported and never abort the run

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod loader;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use crate::config::Settings;
pub use crate::core::error::{Error, Result};
pub use crate::core::reconcile::{ControlPlane, Outcome, Reconciler};
pub use crate::core::rule::{CanonicalRule, RemoteRule, RuleSpec};
