//! Topology reconciliation core for the meshplan floor-plan editor.
//!
//! This crate owns the two state containers of a meshplan project and the
//! logic that keeps them referentially consistent:
//!
//! - **[`TopologyStore`]**: Logical network model: devices grouped into
//!   numbered loops (1–24) and the edges between them.
//!   [`import_loop()`](TopologyStore::import_loop) reconciles a freshly parsed
//!   vendor export against the loop's known devices, classifying each device
//!   as updated, new, or missing. Missing devices are kept as ghosts until the
//!   user clears them.
//!
//! - **[`SiteStore`]**: Spatial model: buildings, floors, and the `(x, y)`
//!   placement plus optional alias of every device dragged onto a floor plan.
//!
//! - **Cascade delete**: Loop deletion and missing-device clearing run as a
//!   two-phase [`RemovalPlan`]: the affected device ids are computed from the
//!   pre-mutation topology, handed to a [`PlacementSink`] (the Site Store),
//!   and only then is the topology mutation committed.
//!
//! - **[`Project`]**: Explicit context object owning both stores, plus the
//!   JSON project envelope used for save / load.
//!
//! - **[`tree`]**: Display hierarchy builder (LEADER roots, hoisted ROUTER
//!   backbone, nested CHILD leaves, orphans).
//!
//! - **[`parse`]** and **[`sync`]**: Vendor export parsing and the
//!   best-effort backend synchronization side channel.
//!
//! Both stores are copy-on-write: every operation builds the complete next
//! state and commits it in one step, publishing an `Arc` snapshot that
//! readers obtain through [`SnapshotStream`].

pub mod config;
pub mod error;
pub mod model;
pub mod parse;
pub mod project;
pub mod site;
pub mod stream;
pub mod sync;
pub mod topology;
pub mod tree;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SyncConfig;
pub use error::CoreError;
pub use project::{Location, Notice, Project, ProjectFile};
pub use site::{FloorUpdate, SiteState, SiteStore};
pub use stream::SnapshotStream;
pub use sync::{SyncPayload, TopologySync};
pub use topology::{
    ImportSummary, LoopStats, MacConflict, PlacementSink, RemovalPlan, RemovalReport,
    RemovalScope, TopologyState, TopologyStore, validate_mac_conflicts,
};
pub use tree::{TopologyTreeNode, TreeResult, build_topology_tree, filter_topology_nodes};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Building, Device, DeviceRecord, DeviceRole, DeviceStatus, Edge, Floor, LoopId, MAX_LOOPS,
    MacAddress, NodeLocation, ParsedTopology, PlacedNode,
};
