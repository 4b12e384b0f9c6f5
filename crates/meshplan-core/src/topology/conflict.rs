// ── MAC identity validation ──
//
// A MAC may belong to at most one loop at any time. Imports are checked
// against every other loop before anything is merged.

use std::collections::HashMap;
use std::fmt;

use crate::error::CoreError;
use crate::model::{Device, DeviceRecord, LoopId, MacAddress};

/// An incoming MAC that another loop already owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacConflict {
    /// The MAC as spelled in the incoming data.
    pub mac: MacAddress,
    /// The loop currently owning it.
    pub owner: LoopId,
}

impl fmt::Display for MacConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAC conflict: {} already exists in loop {}",
            self.mac, self.owner
        )
    }
}

impl From<MacConflict> for CoreError {
    fn from(c: MacConflict) -> Self {
        CoreError::MacConflict {
            mac: c.mac.to_string(),
            owner: c.owner,
        }
    }
}

/// Find the first incoming device whose MAC (case-insensitive) belongs to a
/// loop other than `target`.
///
/// Fails fast: only the first conflict in incoming order is reported.
pub fn validate_mac_conflicts(
    all_devices: &[Device],
    incoming: &[DeviceRecord],
    target: LoopId,
) -> Option<MacConflict> {
    let owners: HashMap<&MacAddress, LoopId> = all_devices
        .iter()
        .filter(|d| d.loop_id != target)
        .map(|d| (&d.mac, d.loop_id))
        .collect();

    incoming.iter().find_map(|record| {
        owners.get(&record.mac).map(|&owner| MacConflict {
            mac: record.mac.clone(),
            owner,
        })
    })
}
