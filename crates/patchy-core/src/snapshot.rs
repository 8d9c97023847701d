//! Capture live connections as a [`Patch`].

use tracing::debug;

use crate::patch::Patch;
use crate::registry::PortRegistry;

/// Build a patch from the connections currently present on the server.
///
/// Outputs with no connections are left out. The server may change while
/// ports are being enumerated; the result reflects each port at the moment
/// it was queried.
pub fn snapshot<R: PortRegistry + ?Sized>(registry: &R) -> Patch {
    let mut patch = Patch::new();
    for output in registry.output_ports() {
        let inputs = registry.connections_of(&output);
        if !inputs.is_empty() {
            patch.set_destinations(output, inputs);
        }
    }
    debug!(outputs = patch.outputs().count(), connections = patch.len(), "Snapshot taken");
    patch
}
