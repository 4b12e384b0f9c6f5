// ── Unified domain model ──
//
// Every type in this module is the canonical representation of a meshplan
// entity, shared by the Topology Store, the Site Store, and the project
// file envelope.

pub mod device;
pub mod edge;
pub mod identity;
pub mod site;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use meshplan_core::model::*` gives you everything.

// Core identity
pub use identity::{LoopId, MAX_LOOPS, MacAddress};

// Topology
pub use device::{Device, DeviceRecord, DeviceRole, DeviceStatus};
pub use edge::Edge;

// Spatial
pub use site::{Building, Floor, NodeLocation, PlacedNode};

use serde::{Deserialize, Serialize};

/// One vendor export, already parsed, scoped to a single loop.
///
/// Produced by [`crate::parse::parse_topology`] (or any other parser) and
/// handed to [`crate::TopologyStore::import_loop`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedTopology {
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}
