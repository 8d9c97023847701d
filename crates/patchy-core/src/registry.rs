//! Access to the live port graph of an audio server.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::LinkError;
use crate::patch::{Connection, Patch};

/// Live view of the ports and connections of an audio server.
///
/// Every call queries or mutates the server directly; nothing is cached.
#[cfg_attr(test, mockall::automock)]
pub trait PortRegistry {
    /// Names of every port that can act as a connection source.
    fn output_ports(&self) -> BTreeSet<String>;

    /// Names of every port, sources and sinks alike.
    fn all_ports(&self) -> BTreeSet<String>;

    /// Ports currently connected to `port`. Empty if there are none or the
    /// port does not exist.
    fn connections_of(&self, port: &str) -> BTreeSet<String>;

    /// Connect `output` to `input`.
    ///
    /// # Errors
    /// [`LinkError::AlreadyConnected`] if the link exists, otherwise
    /// [`LinkError::Failed`].
    fn connect(&self, output: &str, input: &str) -> Result<(), LinkError>;

    /// Disconnect `output` from `input`.
    ///
    /// # Errors
    /// [`LinkError::Failed`] if the server refuses.
    fn disconnect(&self, output: &str, input: &str) -> Result<(), LinkError>;
}

/// A registry call, as recorded by [`MemoryRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Connect(Connection),
    Disconnect(Connection),
}

/// In-memory port universe.
///
/// Behaves like a running server: connecting requires both ports to exist,
/// removing a port drops its connections. Failures can be injected per
/// connection and every mutation is logged.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Port name -> is output
    ports: BTreeMap<String, bool>,
    links: Patch,
    failing: BTreeSet<Connection>,
    calls: Vec<RegistryCall>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an output port.
    pub fn add_output(&self, name: impl Into<String>) {
        self.state.write().ports.insert(name.into(), true);
    }

    /// Register an input port.
    pub fn add_input(&self, name: impl Into<String>) {
        self.state.write().ports.insert(name.into(), false);
    }

    /// Remove a port and every connection touching it.
    pub fn remove_port(&self, name: &str) {
        let mut state = self.state.write();
        state.ports.remove(name);
        let stale: Vec<Connection> = state
            .links
            .connections()
            .filter(|c| c.output == name || c.input == name)
            .collect();
        for connection in stale {
            state.links.remove(&connection.output, &connection.input);
        }
    }

    /// Place a connection without recording a call.
    pub fn link(&self, output: impl Into<String>, input: impl Into<String>) {
        self.state.write().links.insert(output, input);
    }

    /// Make connect/disconnect of this pair fail.
    pub fn fail_on(&self, connection: Connection) {
        self.state.write().failing.insert(connection);
    }

    /// Current connections.
    #[must_use]
    pub fn links(&self) -> Patch {
        self.state.read().links.clone()
    }

    /// Mutations attempted so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.read().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.write().calls.clear();
    }
}

impl PortRegistry for MemoryRegistry {
    fn output_ports(&self) -> BTreeSet<String> {
        self.state
            .read()
            .ports
            .iter()
            .filter(|(_, is_output)| **is_output)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn all_ports(&self) -> BTreeSet<String> {
        self.state.read().ports.keys().cloned().collect()
    }

    fn connections_of(&self, port: &str) -> BTreeSet<String> {
        self.state.read().links.destinations(port).cloned().unwrap_or_default()
    }

    fn connect(&self, output: &str, input: &str) -> Result<(), LinkError> {
        let mut state = self.state.write();
        let connection = Connection::new(output, input);
        debug!(%connection, "memory connect");
        state.calls.push(RegistryCall::Connect(connection.clone()));

        if state.failing.contains(&connection) {
            return Err(LinkError::Failed("injected failure".to_string()));
        }
        if state.ports.get(output) != Some(&true) || state.ports.get(input) != Some(&false) {
            return Err(LinkError::Failed("no such ports".to_string()));
        }
        if state.links.insert(output, input) {
            Ok(())
        } else {
            Err(LinkError::AlreadyConnected)
        }
    }

    fn disconnect(&self, output: &str, input: &str) -> Result<(), LinkError> {
        let mut state = self.state.write();
        let connection = Connection::new(output, input);
        debug!(%connection, "memory disconnect");
        state.calls.push(RegistryCall::Disconnect(connection.clone()));

        if state.failing.contains(&connection) {
            return Err(LinkError::Failed("injected failure".to_string()));
        }
        if state.links.remove(output, input) {
            Ok(())
        } else {
            Err(LinkError::Failed("not connected".to_string()))
        }
    }
}
