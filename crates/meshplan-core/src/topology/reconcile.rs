// ── Loop reconciliation ──
//
// Merges a freshly parsed device list into one loop's known devices.
// Matching devices are updated in place, unknown ones are added as new,
// and known devices absent from the import are kept as missing ghosts.

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Device, DeviceRecord, LoopId, MacAddress};

/// What one import did to a loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub loop_id: LoopId,
    /// Known devices seen again (now active).
    pub updated: Vec<MacAddress>,
    /// Devices seen for the first time (active, flagged new).
    pub added: Vec<MacAddress>,
    /// Known devices absent from this import (retained as missing).
    pub missing: Vec<MacAddress>,
    /// Edges now owned by the loop.
    pub edges: usize,
}

impl ImportSummary {
    fn new(loop_id: LoopId) -> Self {
        Self {
            loop_id,
            updated: Vec::new(),
            added: Vec::new(),
            missing: Vec::new(),
            edges: 0,
        }
    }
}

pub(crate) struct LoopMerge {
    pub devices: Vec<Device>,
    pub summary: ImportSummary,
}

/// Merge `incoming` into `prior` (the loop's current devices).
///
/// Prior devices keep their order; new devices follow in incoming order.
/// Duplicate MACs in `incoming` collapse onto the first position with the
/// last record winning.
pub(crate) fn merge_loop(
    prior: Vec<Device>,
    incoming: Vec<DeviceRecord>,
    loop_id: LoopId,
) -> LoopMerge {
    let mut pending: IndexMap<MacAddress, DeviceRecord> = incoming
        .into_iter()
        .map(|record| (record.mac.clone(), record))
        .collect();

    let mut summary = ImportSummary::new(loop_id);
    let mut devices = Vec::with_capacity(prior.len() + pending.len());

    for mut known in prior {
        if let Some(record) = pending.shift_remove(&known.mac) {
            known.absorb(record);
            summary.updated.push(known.mac.clone());
        } else {
            known.mark_missing();
            summary.missing.push(known.mac.clone());
        }
        devices.push(known);
    }

    for (_, record) in pending {
        let device = Device::discovered(record, loop_id);
        summary.added.push(device.mac.clone());
        devices.push(device);
    }

    LoopMerge { devices, summary }
}
