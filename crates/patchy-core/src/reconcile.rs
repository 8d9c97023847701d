//! Bring live connections in line with a target patch.

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{Error, LinkError, Result};
use crate::patch::{Connection, Patch};
use crate::registry::PortRegistry;
use crate::snapshot::snapshot;

/// A single change the reconciler will make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Remove a connection that the target does not have
    Disconnect(Connection),
    /// Create a connection that the server does not have
    Connect(Connection),
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnect(connection) => write!(f, "disconnect {connection}"),
            Self::Connect(connection) => write!(f, "connect {connection}"),
        }
    }
}

/// Ordered list of actions. Every disconnect comes before every connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    actions: Vec<ReconcileAction>,
}

impl ReconcilePlan {
    /// Diff `current` against `target`.
    #[must_use]
    pub fn between(current: &Patch, target: &Patch) -> Self {
        let disconnects = current
            .connections()
            .filter(|c| !target.contains(&c.output, &c.input))
            .map(ReconcileAction::Disconnect);
        let connects = target
            .connections()
            .filter(|c| !current.contains(&c.output, &c.input))
            .map(ReconcileAction::Connect);
        Self { actions: disconnects.chain(connects).collect() }
    }

    #[must_use]
    pub fn actions(&self) -> &[ReconcileAction] {
        &self.actions
    }

    /// True when live state already matches the target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of planned disconnects.
    #[must_use]
    pub fn disconnects(&self) -> usize {
        self.actions.iter().filter(|a| matches!(a, ReconcileAction::Disconnect(_))).count()
    }

    /// Number of planned connects.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.actions.len() - self.disconnects()
    }
}

/// What an applied plan actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub disconnected: usize,
    pub connected: usize,
    /// Connects the server reported as already in place
    pub already_connected: usize,
}

/// Reconciler that compares a target patch against the live server.
pub struct Reconciler<'a, R: PortRegistry + ?Sized> {
    registry: &'a R,
}

impl<'a, R: PortRegistry + ?Sized> Reconciler<'a, R> {
    /// Create a new reconciler.
    #[must_use]
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Compute the actions needed to reach `target`.
    ///
    /// Every port in `target` is expected to exist; check with
    /// [`crate::availability::missing`] first.
    #[must_use]
    pub fn plan(&self, target: &Patch) -> ReconcilePlan {
        let current = snapshot(self.registry);
        let plan = ReconcilePlan::between(&current, target);
        debug!(disconnects = plan.disconnects(), connects = plan.connects(), "Reconcile planned");
        plan
    }

    /// Execute a plan in order, stopping at the first failure.
    ///
    /// Changes made before a failure are left in place.
    ///
    /// # Errors
    /// [`Error::DisconnectFailed`] or [`Error::ConnectFailed`] naming the
    /// connection that could not be changed.
    pub fn apply(&self, plan: &ReconcilePlan) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for action in plan.actions() {
            match action {
                ReconcileAction::Disconnect(connection) => {
                    debug!(%connection, "Disconnecting");
                    self.registry
                        .disconnect(&connection.output, &connection.input)
                        .map_err(|e| Error::DisconnectFailed {
                            connection: connection.clone(),
                            reason: e.to_string(),
                        })?;
                    report.disconnected += 1;
                }
                ReconcileAction::Connect(connection) => {
                    debug!(%connection, "Connecting");
                    match self.registry.connect(&connection.output, &connection.input) {
                        Ok(()) => report.connected += 1,
                        Err(LinkError::AlreadyConnected) => {
                            warn!(%connection, "Already connected");
                            report.already_connected += 1;
                        }
                        Err(LinkError::Failed(reason)) => {
                            return Err(Error::ConnectFailed {
                                connection: connection.clone(),
                                reason,
                            });
                        }
                    }
                }
            }
        }

        info!(
            disconnected = report.disconnected,
            connected = report.connected,
            already_connected = report.already_connected,
            "Patch recalled"
        );
        Ok(report)
    }

    /// Plan and apply in one step.
    ///
    /// # Errors
    /// See [`Reconciler::apply`].
    pub fn reconcile(&self, target: &Patch) -> Result<ReconcileReport> {
        let plan = self.plan(target);
        self.apply(&plan)
    }

    /// Check whether live connections already match `target`.
    #[must_use]
    pub fn is_in_sync(&self, target: &Patch) -> bool {
        self.plan(target).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;
    use crate::registry::{MemoryRegistry, RegistryCall};

    fn scenario() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.add_output("a_out");
        registry.add_input("b_in");
        registry.add_input("c_in");
        registry.link("a_out", "b_in");
        registry
    }

    fn target() -> Patch {
        let mut patch = Patch::new();
        patch.insert("a_out", "c_in");
        patch
    }

    #[test]
    fn test_disconnects_then_connects() {
        let registry = scenario();

        let report = Reconciler::new(&registry).reconcile(&target()).unwrap();

        assert_eq!(
            registry.calls(),
            vec![
                RegistryCall::Disconnect(Connection::new("a_out", "b_in")),
                RegistryCall::Connect(Connection::new("a_out", "c_in")),
            ]
        );
        assert_eq!(report, ReconcileReport { disconnected: 1, connected: 1, already_connected: 0 });
        assert_eq!(snapshot(&registry), target());
    }

    #[test]
    fn test_plan_orders_disconnects_first() {
        let mut current = Patch::new();
        current.insert("x_out", "z_in");
        current.insert("a_out", "b_in");
        let mut target = Patch::new();
        target.insert("a_out", "a_in");
        target.insert("m_out", "b_in");

        let plan = ReconcilePlan::between(&current, &target);

        let first_connect = plan
            .actions()
            .iter()
            .position(|a| matches!(a, ReconcileAction::Connect(_)))
            .unwrap();
        assert_eq!(first_connect, plan.disconnects());
        assert_eq!(plan.disconnects(), 2);
        assert_eq!(plan.connects(), 2);
    }

    #[test]
    fn test_shared_connections_are_untouched() {
        let registry = scenario();
        let mut target = target();
        target.insert("a_out", "b_in");

        Reconciler::new(&registry).reconcile(&target).unwrap();

        assert_eq!(registry.calls(), vec![RegistryCall::Connect(Connection::new("a_out", "c_in"))]);
        assert_eq!(registry.links(), target);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let registry = scenario();
        let reconciler = Reconciler::new(&registry);

        reconciler.reconcile(&target()).unwrap();
        let after_first = registry.links();
        registry.clear_calls();

        let report = reconciler.reconcile(&target()).unwrap();

        assert_eq!(report, ReconcileReport::default());
        assert!(registry.calls().is_empty());
        assert_eq!(registry.links(), after_first);
        assert!(reconciler.is_in_sync(&target()));
    }

    #[test]
    fn test_empty_target_clears_everything() {
        let registry = scenario();
        registry.add_output("d_out");
        registry.link("d_out", "c_in");

        let report = Reconciler::new(&registry).reconcile(&Patch::new()).unwrap();

        assert_eq!(report.disconnected, 2);
        assert!(registry.links().is_empty());
    }

    #[test]
    fn test_disconnect_failure_stops_before_connects() {
        let registry = scenario();
        registry.fail_on(Connection::new("a_out", "b_in"));

        let err = Reconciler::new(&registry).reconcile(&target()).unwrap_err();

        assert_matches!(
            err,
            Error::DisconnectFailed { connection, .. } if connection == Connection::new("a_out", "b_in")
        );
        assert_eq!(registry.calls().len(), 1);
        assert!(!registry.links().contains("a_out", "c_in"));
    }

    #[test]
    fn test_connect_failure_keeps_earlier_changes() {
        let registry = scenario();
        registry.add_input("d_in");
        registry.fail_on(Connection::new("a_out", "d_in"));
        let mut target = target();
        target.insert("a_out", "d_in");

        let err = Reconciler::new(&registry).reconcile(&target).unwrap_err();

        assert_matches!(
            err,
            Error::ConnectFailed { connection, .. } if connection == Connection::new("a_out", "d_in")
        );
        // a_out -> c_in sorts before a_out -> d_in and was applied
        assert!(registry.links().contains("a_out", "c_in"));
        assert!(!registry.links().contains("a_out", "b_in"));
    }

    #[test]
    fn test_already_connected_counts_as_success() {
        let registry = scenario();
        // Link appears between planning and applying
        let plan = Reconciler::new(&registry).plan(&target());
        registry.link("a_out", "c_in");

        let report = Reconciler::new(&registry).apply(&plan).unwrap();

        assert_eq!(report.already_connected, 1);
        assert_eq!(report.connected, 0);
        assert_eq!(registry.links(), target());
    }

    fn patch_strategy() -> impl Strategy<Value = Patch> {
        proptest::collection::vec(("[a-d]_out", "[a-d]_in"), 0..10)
            .prop_map(|pairs| pairs.into_iter().map(|(o, i)| Connection::new(o, i)).collect())
    }

    fn full_universe() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        for name in ["a", "b", "c", "d"] {
            registry.add_output(format!("{name}_out"));
            registry.add_input(format!("{name}_in"));
        }
        registry
    }

    proptest! {
        #[test]
        fn prop_reconcile_touches_only_the_difference(
            current in patch_strategy(),
            target in patch_strategy(),
        ) {
            let registry = full_universe();
            for connection in current.connections() {
                registry.link(connection.output, connection.input);
            }

            Reconciler::new(&registry).reconcile(&target).unwrap();

            let calls = registry.calls();
            let split = calls
                .iter()
                .position(|c| matches!(c, RegistryCall::Connect(_)))
                .unwrap_or(calls.len());
            let disconnected: BTreeSet<Connection> = calls[..split]
                .iter()
                .map(|c| match c {
                    RegistryCall::Disconnect(connection) => connection.clone(),
                    RegistryCall::Connect(connection) => panic!("connect {connection} before disconnects finished"),
                })
                .collect();
            let connected: BTreeSet<Connection> = calls[split..]
                .iter()
                .map(|c| match c {
                    RegistryCall::Connect(connection) => connection.clone(),
                    RegistryCall::Disconnect(connection) => panic!("disconnect {connection} after a connect"),
                })
                .collect();

            let expected_disconnects: BTreeSet<Connection> =
                current.connections().filter(|c| !target.contains(&c.output, &c.input)).collect();
            let expected_connects: BTreeSet<Connection> =
                target.connections().filter(|c| !current.contains(&c.output, &c.input)).collect();
            prop_assert_eq!(disconnected, expected_disconnects);
            prop_assert_eq!(connected, expected_connects);
            prop_assert_eq!(snapshot(&registry), target.clone());

            registry.clear_calls();
            let report = Reconciler::new(&registry).reconcile(&target).unwrap();
            prop_assert_eq!(report, ReconcileReport::default());
            prop_assert!(registry.calls().is_empty());
        }
    }

    #[test]
    fn test_action_display() {
        let action = ReconcileAction::Connect(Connection::new("a_out", "c_in"));
        assert_eq!(action.to_string(), r#"connect "a_out" -> "c_in""#);
    }
}
