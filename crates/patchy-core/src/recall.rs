//! The `store` and `recall` workflows on top of a registry.

use std::time::Duration;

use tracing::info;

use crate::availability::{await_availability, first_missing};
use crate::error::{Error, Result};
use crate::patch::Patch;
use crate::persistence::{self, DocumentStyle, PatchLocation};
use crate::reconcile::{ReconcilePlan, ReconcileReport, Reconciler};
use crate::registry::PortRegistry;
use crate::snapshot::snapshot;

/// How to treat ports the target refers to but the server lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Wait up to the given time, then report every missing port at once
    #[default]
    Wait,
    /// Fail on the first missing port without waiting
    Strict,
}

/// Options for [`recall`].
#[derive(Debug, Clone, Default)]
pub struct RecallOptions {
    /// How long to wait for missing ports under [`MissingPolicy::Wait`]
    pub wait: Duration,
    pub policy: MissingPolicy,
    /// Compute the plan without touching any connection
    pub dry_run: bool,
}

/// Result of a recall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecallOutcome {
    Applied(ReconcileReport),
    Planned(ReconcilePlan),
}

/// Make the server's connections match `target`.
///
/// Ports are checked before anything is changed, so a missing port leaves the
/// server untouched.
///
/// # Errors
/// [`Error::PortsMissing`] or [`Error::PortMissing`] depending on the policy,
/// or the first connect/disconnect failure.
pub async fn recall<R: PortRegistry + ?Sized>(
    registry: &R,
    target: &Patch,
    options: &RecallOptions,
) -> Result<RecallOutcome> {
    match options.policy {
        MissingPolicy::Wait => {
            let needed = await_availability(target, registry, options.wait).await;
            if !needed.is_empty() {
                return Err(Error::PortsMissing(needed));
            }
        }
        MissingPolicy::Strict => {
            if let Some(port) = first_missing(target, registry) {
                return Err(Error::PortMissing(port));
            }
        }
    }

    let reconciler = Reconciler::new(registry);
    if options.dry_run {
        let plan = reconciler.plan(target);
        info!(disconnects = plan.disconnects(), connects = plan.connects(), "Dry run");
        return Ok(RecallOutcome::Planned(plan));
    }
    reconciler.reconcile(target).map(RecallOutcome::Applied)
}

/// Snapshot the server and write the patch to `location`.
///
/// # Errors
/// [`Error::Io`] if the destination cannot be created or written.
pub fn store_snapshot<R: PortRegistry + ?Sized>(
    registry: &R,
    location: &PatchLocation,
    style: DocumentStyle,
) -> Result<Patch> {
    let patch = snapshot(registry);
    persistence::store(&patch, location, style)?;
    info!(outputs = patch.outputs().count(), connections = patch.len(), "Patch stored");
    Ok(patch)
}
