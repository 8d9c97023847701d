//! Checks that the ports a patch refers to exist.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::patch::Patch;
use crate::registry::PortRegistry;

/// How often [`await_availability`] re-checks the server.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// List every port referenced by `patch` that the server does not have.
///
/// The result is sorted and contains each name once. It is empty when every
/// referenced port exists.
pub fn missing<R: PortRegistry + ?Sized>(patch: &Patch, registry: &R) -> Vec<String> {
    let ports = registry.all_ports();
    patch
        .ports()
        .into_iter()
        .filter(|name| !ports.contains(*name))
        .map(str::to_string)
        .collect()
}

/// Return the first referenced port the server does not have, if any.
///
/// Stops at the first miss instead of building the full list.
pub fn first_missing<R: PortRegistry + ?Sized>(patch: &Patch, registry: &R) -> Option<String> {
    let ports = registry.all_ports();
    patch.ports().into_iter().find(|name| !ports.contains(*name)).map(str::to_string)
}

/// Wait up to `timeout` for every referenced port to appear.
///
/// Re-checks every [`POLL_INTERVAL`] and returns an empty list as soon as
/// nothing is missing. When the deadline passes first, returns what was
/// missing at the last check. A zero timeout checks exactly once.
pub async fn await_availability<R: PortRegistry + ?Sized>(
    patch: &Patch,
    registry: &R,
    timeout: Duration,
) -> Vec<String> {
    let mut needed = missing(patch, registry);
    if needed.is_empty() || timeout.is_zero() {
        return needed;
    }

    info!(missing = needed.len(), ?timeout, "Waiting for ports");

    let deadline = time::sleep(timeout);
    tokio::pin!(deadline);
    let mut ticker = time::interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = &mut deadline => return needed,
            _ = ticker.tick() => {}
        }

        needed = missing(patch, registry);
        debug!(missing = ?needed, "Port check");
        if needed.is_empty() {
            return needed;
        }
    }
}
