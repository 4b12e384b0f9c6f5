// ── Cascade removal ──
//
// Removing devices from the topology must also drop their floor
// placements. A `RemovalPlan` captures the affected ids from the state as
// it was before anything changed, hands them to a `PlacementSink`, and only
// then commits the topology change.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use super::{TopologyState, TopologyStore};
use crate::model::{Device, Edge, LoopId, MacAddress};

/// Receiver of the placement half of a cascade.
///
/// Implemented by [`SiteStore`](crate::site::SiteStore); closures taking the
/// id slice and returning a count work too.
pub trait PlacementSink {
    /// Drop every placement whose id is in `device_ids`. Returns the number
    /// of placements removed.
    fn remove_placements(&mut self, device_ids: &[MacAddress]) -> usize;
}

impl<F> PlacementSink for F
where
    F: FnMut(&[MacAddress]) -> usize,
{
    fn remove_placements(&mut self, device_ids: &[MacAddress]) -> usize {
        self(device_ids)
    }
}

/// Which removal a plan performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "loopId", rename_all = "camelCase")]
pub enum RemovalScope {
    /// The whole loop: devices, edges and registration.
    Loop(LoopId),
    /// Only the loop's missing devices.
    Missing(LoopId),
    /// An explicit device list.
    Devices,
}

/// Outcome of a committed removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub scope: RemovalScope,
    pub devices_removed: Vec<MacAddress>,
    pub edges_removed: usize,
    pub placements_removed: usize,
    /// Whether a loop registration was dropped.
    pub loop_removed: bool,
}

/// A pending cascade against a [`TopologyStore`].
///
/// The plan holds the store mutably, so its id set cannot go stale before
/// [`commit`](Self::commit).
#[must_use = "a removal plan does nothing until committed"]
#[derive(Debug)]
pub struct RemovalPlan<'a> {
    store: &'a mut TopologyStore,
    scope: RemovalScope,
    device_ids: Vec<MacAddress>,
    /// Vendor ids of the doomed devices, with the loops they are local to.
    raw_ids: HashMap<String, HashSet<LoopId>>,
}

impl<'a> RemovalPlan<'a> {
    pub(super) fn new(
        store: &'a mut TopologyStore,
        scope: RemovalScope,
        doomed: Vec<&Device>,
    ) -> Self {
        let device_ids = doomed.iter().map(|d| d.mac.clone()).collect();
        let mut raw_ids: HashMap<String, HashSet<LoopId>> = HashMap::new();
        for device in &doomed {
            if let Some(raw) = &device.raw_id {
                raw_ids
                    .entry(raw.trim().to_owned())
                    .or_default()
                    .insert(device.loop_id);
            }
        }
        Self {
            store,
            scope,
            device_ids,
            raw_ids,
        }
    }

    pub fn scope(&self) -> RemovalScope {
        self.scope
    }

    /// Devices the plan will delete, in topology order.
    pub fn device_ids(&self) -> &[MacAddress] {
        &self.device_ids
    }

    /// Whether committing would change nothing.
    pub fn is_empty(&self) -> bool {
        match self.scope {
            RemovalScope::Loop(loop_id) => {
                self.device_ids.is_empty() && !self.store.state().is_loop_active(loop_id)
            }
            RemovalScope::Missing(_) | RemovalScope::Devices => self.device_ids.is_empty(),
        }
    }

    /// Run the cascade: placements first, then the topology commit.
    pub fn commit<S: PlacementSink + ?Sized>(self, sink: &mut S) -> RemovalReport {
        let empty = self.is_empty();
        let Self {
            store,
            scope,
            device_ids,
            raw_ids,
        } = self;

        if empty {
            debug!(?scope, "removal plan is empty, nothing to commit");
            return RemovalReport {
                scope,
                devices_removed: device_ids,
                edges_removed: 0,
                placements_removed: 0,
                loop_removed: false,
            };
        }

        let placements_removed = if device_ids.is_empty() {
            0
        } else {
            sink.remove_placements(&device_ids)
        };

        let current = store.state();
        let doomed: HashSet<&MacAddress> = device_ids.iter().collect();
        // Vendor ids restart with every export, so they only name a doomed
        // device on an edge of the same loop (or an untagged legacy edge).
        let names_doomed = |edge: &Edge, reference: &str| {
            doomed.contains(&MacAddress::new(reference))
                || raw_ids.get(reference.trim()).is_some_and(|loops| {
                    edge.loop_id.is_none_or(|owner| loops.contains(&owner))
                })
        };
        let edge_doomed = |edge: &Edge| {
            names_doomed(edge, edge.from.as_str()) || names_doomed(edge, edge.to.as_str())
        };

        let (edges, edges_removed, loop_removed) = match scope {
            RemovalScope::Loop(loop_id) => {
                let kept: Vec<Edge> = current
                    .edges
                    .iter()
                    .filter(|&e| e.loop_id != Some(loop_id) && !edge_doomed(e))
                    .cloned()
                    .collect();
                let removed = current.edges.len() - kept.len();
                (kept, removed, current.is_loop_active(loop_id))
            }
            RemovalScope::Missing(_) | RemovalScope::Devices => {
                let kept: Vec<Edge> = current
                    .edges
                    .iter()
                    .filter(|&e| !edge_doomed(e))
                    .cloned()
                    .collect();
                let removed = current.edges.len() - kept.len();
                (kept, removed, false)
            }
        };

        let next = TopologyState {
            devices: current
                .devices
                .iter()
                .filter(|d| !doomed.contains(&d.mac))
                .cloned()
                .collect(),
            edges,
            active_loop_ids: match scope {
                RemovalScope::Loop(loop_id) => current
                    .active_loop_ids
                    .iter()
                    .copied()
                    .filter(|l| *l != loop_id)
                    .collect(),
                RemovalScope::Missing(_) | RemovalScope::Devices => {
                    current.active_loop_ids.clone()
                }
            },
        };
        store.commit(next);

        info!(
            ?scope,
            devices = device_ids.len(),
            edges = edges_removed,
            placements = placements_removed,
            "removal committed"
        );

        RemovalReport {
            scope,
            devices_removed: device_ids,
            edges_removed,
            placements_removed,
            loop_removed,
        }
    }
}
