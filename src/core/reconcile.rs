//! Reconciliation of desired rules against live NSG state
//!
//! For each desired rule the reconciler normalizes the spec, fetches the
//! current remote record and issues an upsert only when the two differ under
//! the normalized field-set equality. Absence of a remote rule is a normal
//! case, not an error. Each rule is independent: a failure is reported and
//! the caller moves on to the next rule.

use tracing::{debug, info, warn};

use crate::core::error::Result;
use crate::core::rule::{CanonicalRule, RemoteRule, RuleSpec};

/// The two operations the reconciler needs from the control-plane.
///
/// The reference implementation shells out to the az CLI
/// ([`crate::core::az_cli::AzCli`]); tests substitute an in-memory fake.
///
/// Callers drive these futures from a single-threaded `block_on`, so no
/// `Send` bound is imposed.
#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    /// Reads the current record for a rule name. `Ok(None)` means the rule
    /// does not exist, which is a legitimate state rather than an error.
    async fn fetch_rule(&self, name: &str) -> Result<Option<RemoteRule>>;

    /// Creates or replaces a rule. The operation is an idempotent upsert:
    /// issuing it against an existing name overwrites that rule.
    async fn upsert_rule(&self, rule: &CanonicalRule) -> Result<()>;
}

/// Result of reconciling one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Remote state already matched the desired state; nothing was written
    Skipped,
    /// The rule was created or updated
    Applied,
    /// The control-plane call failed; processing continues with the next rule
    Failed(String),
}

/// Drives create/update decisions for one fixed NSG scope
pub struct Reconciler<'a, C> {
    control_plane: &'a C,
}

impl<'a, C: ControlPlane> Reconciler<'a, C> {
    pub fn new(control_plane: &'a C) -> Self {
        Self { control_plane }
    }

    /// Reconciles a single desired rule against the live state.
    ///
    /// Never returns an error: every failure mode is folded into
    /// [`Outcome::Failed`] so one bad rule cannot abort the run.
    pub async fn reconcile(&self, spec: &RuleSpec) -> Outcome {
        let desired = match spec.canonicalize() {
            Ok(desired) => desired,
            Err(e) => return Outcome::Failed(e.to_string()),
        };

        let existing = match self.control_plane.fetch_rule(&spec.name).await {
            Ok(existing) => existing,
            Err(e) => {
                // A read failure is not absence. Creating on top of it could
                // clobber a rule we simply could not see.
                warn!(rule = %spec.name, "fetch failed: {e}");
                return Outcome::Failed(e.to_string());
            }
        };

        if let Some(remote) = existing {
            if desired.matches_remote(&remote) {
                debug!(rule = %spec.name, "remote state already matches");
                return Outcome::Skipped;
            }
            info!(rule = %spec.name, "remote state drifted, updating");
        } else {
            info!(rule = %spec.name, "no existing rule, creating");
        }

        match self.control_plane.upsert_rule(&desired).await {
            Ok(()) => Outcome::Applied,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}
