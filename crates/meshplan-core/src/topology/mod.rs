// ── Topology store ──
//
// Owns every loop's devices and edges. All mutations build the complete
// next state and commit it once; a failed operation commits nothing.

mod conflict;
mod reconcile;
mod removal;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Device, Edge, LoopId, MAX_LOOPS, MacAddress, ParsedTopology};
use crate::stream::{Published, SnapshotStream};

pub use conflict::{MacConflict, validate_mac_conflicts};
pub use reconcile::ImportSummary;
pub use removal::{PlacementSink, RemovalPlan, RemovalReport, RemovalScope};

/// Committed topology: every device of every loop plus tagged edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyState {
    #[serde(default, rename = "unassignedDevices", alias = "devices")]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Registered loops, ascending.
    #[serde(default)]
    pub active_loop_ids: Vec<LoopId>,
}

/// Per-loop device counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopStats {
    pub loop_id: LoopId,
    pub active: usize,
    pub missing: usize,
    pub new: usize,
    pub edges: usize,
}

impl TopologyState {
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn active_loops(&self) -> &[LoopId] {
        &self.active_loop_ids
    }

    pub fn is_loop_active(&self, loop_id: LoopId) -> bool {
        self.active_loop_ids.contains(&loop_id)
    }

    pub fn loop_devices(&self, loop_id: LoopId) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(move |d| d.loop_id == loop_id)
    }

    pub fn loop_edges(&self, loop_id: LoopId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.loop_id == Some(loop_id))
    }

    /// Look up a device by MAC, case-insensitively.
    pub fn device(&self, mac: &MacAddress) -> Option<&Device> {
        self.devices.iter().find(|d| d.mac == *mac)
    }

    pub fn loop_stats(&self, loop_id: LoopId) -> LoopStats {
        let mut stats = LoopStats {
            loop_id,
            active: 0,
            missing: 0,
            new: 0,
            edges: self.loop_edges(loop_id).count(),
        };
        for device in self.loop_devices(loop_id) {
            if device.is_missing() {
                stats.missing += 1;
            } else {
                stats.active += 1;
            }
            if device.is_new {
                stats.new += 1;
            }
        }
        stats
    }

    /// Sort and dedupe the loop list, registering any loop a device claims.
    fn normalized(mut self) -> Self {
        self.active_loop_ids
            .extend(self.devices.iter().map(|d| d.loop_id));
        self.active_loop_ids.sort_unstable();
        self.active_loop_ids.dedup();
        self
    }
}

/// Single owner of the topology state.
///
/// Readers take [`state()`](Self::state) snapshots or
/// [`subscribe()`](Self::subscribe); writers go through the operations
/// below, each of which commits at most once.
#[derive(Debug)]
pub struct TopologyStore {
    state: Published<TopologyState>,
}

impl Default for TopologyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::from_state(TopologyState::default())
    }

    /// Restore a previously saved state.
    pub fn from_state(state: TopologyState) -> Self {
        Self {
            state: Published::new(state.normalized()),
        }
    }

    /// The current committed snapshot.
    pub fn state(&self) -> Arc<TopologyState> {
        self.state.get()
    }

    pub fn subscribe(&self) -> SnapshotStream<TopologyState> {
        self.state.subscribe()
    }

    pub(crate) fn commit(&mut self, next: TopologyState) {
        self.state.commit(next);
    }

    // ── Loop registration ────────────────────────────────────────────

    /// Register an empty loop. Returns `false` if it was already registered.
    pub fn add_loop(&mut self, loop_id: LoopId) -> Result<bool, CoreError> {
        let current = self.state();
        if current.is_loop_active(loop_id) {
            return Ok(false);
        }
        if current.active_loop_ids.len() >= MAX_LOOPS {
            return Err(CoreError::LoopLimit { max: MAX_LOOPS });
        }

        let mut next = TopologyState::clone(&current);
        next.active_loop_ids.push(loop_id);
        next.active_loop_ids.sort_unstable();
        self.commit(next);
        debug!(%loop_id, "loop registered");
        Ok(true)
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Merge a fresh export into `loop_id`.
    ///
    /// Rejects the whole import if any incoming MAC belongs to another loop.
    /// Otherwise known devices are updated, new ones are added, absent ones
    /// become missing, and the loop's edges are replaced by the imported set.
    /// Importing into an unregistered loop registers it.
    pub fn import_loop(
        &mut self,
        loop_id: LoopId,
        parsed: ParsedTopology,
    ) -> Result<ImportSummary, CoreError> {
        let current = self.state();

        if let Some(conflict) = validate_mac_conflicts(&current.devices, &parsed.devices, loop_id)
        {
            warn!(mac = %conflict.mac, owner = %conflict.owner, %loop_id, "import rejected");
            return Err(conflict.into());
        }
        if !current.is_loop_active(loop_id) && current.active_loop_ids.len() >= MAX_LOOPS {
            return Err(CoreError::LoopLimit { max: MAX_LOOPS });
        }

        let (prior, mut devices): (Vec<Device>, Vec<Device>) = current
            .devices
            .iter()
            .cloned()
            .partition(|d| d.loop_id == loop_id);

        let merge = reconcile::merge_loop(prior, parsed.devices, loop_id);
        devices.extend(merge.devices);

        let mut edges: Vec<Edge> = current
            .edges
            .iter()
            .filter(|e| e.loop_id != Some(loop_id))
            .cloned()
            .collect();
        let owned = parsed.edges.len();
        edges.extend(parsed.edges.into_iter().map(|e| e.in_loop(loop_id)));

        let mut active_loop_ids = current.active_loop_ids.clone();
        if !current.is_loop_active(loop_id) {
            active_loop_ids.push(loop_id);
            active_loop_ids.sort_unstable();
        }

        self.commit(TopologyState {
            devices,
            edges,
            active_loop_ids,
        });

        let mut summary = merge.summary;
        summary.edges = owned;
        info!(
            %loop_id,
            updated = summary.updated.len(),
            added = summary.added.len(),
            missing = summary.missing.len(),
            edges = owned,
            "loop reconciled"
        );
        Ok(summary)
    }

    // ── Removal planning ─────────────────────────────────────────────

    /// Plan deleting a loop with all its devices and edges.
    pub fn plan_loop_removal(&mut self, loop_id: LoopId) -> RemovalPlan<'_> {
        let current = self.state();
        let doomed = current.loop_devices(loop_id).collect();
        RemovalPlan::new(self, RemovalScope::Loop(loop_id), doomed)
    }

    /// Plan deleting a loop's missing devices.
    pub fn plan_missing_clear(&mut self, loop_id: LoopId) -> RemovalPlan<'_> {
        let current = self.state();
        let doomed = current
            .loop_devices(loop_id)
            .filter(|d| d.is_missing())
            .collect();
        RemovalPlan::new(self, RemovalScope::Missing(loop_id), doomed)
    }

    /// Plan deleting specific devices. Unknown ids are ignored.
    pub fn plan_device_removal(&mut self, device_ids: &[MacAddress]) -> RemovalPlan<'_> {
        let current = self.state();
        let doomed = current
            .devices
            .iter()
            .filter(|d| device_ids.contains(&d.mac))
            .collect();
        RemovalPlan::new(self, RemovalScope::Devices, doomed)
    }

    // ── Removal shorthands ───────────────────────────────────────────

    pub fn remove_loop<S: PlacementSink + ?Sized>(
        &mut self,
        loop_id: LoopId,
        sink: &mut S,
    ) -> RemovalReport {
        self.plan_loop_removal(loop_id).commit(sink)
    }

    pub fn clear_missing<S: PlacementSink + ?Sized>(
        &mut self,
        loop_id: LoopId,
        sink: &mut S,
    ) -> RemovalReport {
        self.plan_missing_clear(loop_id).commit(sink)
    }

    pub fn remove_devices<S: PlacementSink + ?Sized>(
        &mut self,
        device_ids: &[MacAddress],
        sink: &mut S,
    ) -> RemovalReport {
        self.plan_device_removal(device_ids).commit(sink)
    }

    /// Drop everything. Placements are the caller's concern.
    pub fn clear_all(&mut self) {
        self.commit(TopologyState::default());
        info!("topology cleared");
    }
}
