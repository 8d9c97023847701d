//! patchy core - Patch model and reconciliation.
//!
//! This crate contains everything that does not depend on a particular
//! audio server:
//! - The [`Patch`] model of output-to-input connections
//! - The [`PortRegistry`] trait an audio server backend implements
//! - Snapshotting, port availability checks and reconciliation
//! - Reading and writing patch documents

pub mod availability;
pub mod error;
pub mod patch;
pub mod persistence;
pub mod recall;
pub mod reconcile;
pub mod registry;
pub mod snapshot;

pub use availability::{await_availability, first_missing, missing};
pub use error::{Error, LinkError, Result};
pub use patch::{Connection, Patch};
pub use persistence::{DocumentStyle, PatchLocation};
pub use recall::{MissingPolicy, RecallOptions, RecallOutcome, recall, store_snapshot};
pub use reconcile::{ReconcileAction, ReconcilePlan, ReconcileReport, Reconciler};
pub use registry::{MemoryRegistry, PortRegistry, RegistryCall};
pub use snapshot::snapshot;
