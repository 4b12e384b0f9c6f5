// ── Project context ──
//
// `Project` owns both stores and routes every cross-store operation, so
// cascades always run topology → site in the right order. `ProjectFile`
// is the JSON envelope written to disk.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{LoopId, MacAddress, NodeLocation, ParsedTopology};
use crate::site::{SiteState, SiteStore};
use crate::topology::{ImportSummary, RemovalReport, TopologyState, TopologyStore};

/// Envelope version written by this crate.
pub const PROJECT_VERSION: &str = "1.0";

// ── Envelope ────────────────────────────────────────────────────────

/// On-disk project: both store states plus floor-plan images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: String,
    /// Milliseconds since the Unix epoch at export time.
    pub timestamp: i64,
    #[serde(default)]
    pub topology: TopologyState,
    #[serde(default)]
    pub site: SiteState,
    /// Floor-plan `map_id` → base64 image payload, carried through as-is.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

impl ProjectFile {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::Project {
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Project {
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "project saved");
        Ok(())
    }
}

// ── Queries results ─────────────────────────────────────────────────

/// Where a device stands spatially.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Location {
    /// Known to the topology and placed.
    Placed(NodeLocation),
    /// Not placed on any floor.
    NotDeployed,
    /// Placed, but no loop knows the device.
    Orphaned(NodeLocation),
}

/// A non-fatal inconsistency between the two stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notice {
    /// A placement whose device no loop knows about.
    UnknownPlacement { mac: MacAddress, floor_id: Uuid },
    /// A device placed on more than one floor.
    MultipleFloors { mac: MacAddress, floors: usize },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPlacement { mac, floor_id } => {
                write!(f, "{mac} is placed on floor {floor_id} but belongs to no loop")
            }
            Self::MultipleFloors { mac, floors } => {
                write!(f, "{mac} is placed on {floors} floors")
            }
        }
    }
}

// ── Project ─────────────────────────────────────────────────────────

/// Both stores of one floor-plan project.
#[derive(Debug, Default)]
pub struct Project {
    topology: TopologyStore,
    site: SiteStore,
    images: BTreeMap<String, String>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(file: ProjectFile) -> Self {
        if file.version != PROJECT_VERSION {
            warn!(version = %file.version, "loading project written by a different version");
        }
        Self {
            topology: TopologyStore::from_state(file.topology),
            site: SiteStore::from_state(file.site),
            images: file.images,
        }
    }

    /// Snapshot both stores into an envelope stamped with the current time.
    pub fn to_file(&self) -> ProjectFile {
        ProjectFile {
            version: PROJECT_VERSION.to_owned(),
            timestamp: Utc::now().timestamp_millis(),
            topology: TopologyState::clone(&self.topology.state()),
            site: SiteState::clone(&self.site.state()),
            images: self.images.clone(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        ProjectFile::load(path).map(Self::from_file)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        self.to_file().save(path)
    }

    pub fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    pub fn site(&self) -> &SiteStore {
        &self.site
    }

    /// Spatial edits never touch the topology, so direct access is safe.
    pub fn site_mut(&mut self) -> &mut SiteStore {
        &mut self.site
    }

    pub fn images(&self) -> &BTreeMap<String, String> {
        &self.images
    }

    // ── Topology operations ──────────────────────────────────────────

    pub fn add_loop(&mut self, loop_id: LoopId) -> Result<bool, CoreError> {
        self.topology.add_loop(loop_id)
    }

    pub fn import_loop(
        &mut self,
        loop_id: LoopId,
        parsed: ParsedTopology,
    ) -> Result<ImportSummary, CoreError> {
        self.topology.import_loop(loop_id, parsed)
    }

    /// Delete a loop and every placement of its devices.
    pub fn delete_loop(&mut self, loop_id: LoopId) -> RemovalReport {
        self.topology.remove_loop(loop_id, &mut self.site)
    }

    /// Delete a loop's missing devices and their placements.
    pub fn clear_missing(&mut self, loop_id: LoopId) -> RemovalReport {
        self.topology.clear_missing(loop_id, &mut self.site)
    }

    pub fn remove_devices(&mut self, device_ids: &[MacAddress]) -> RemovalReport {
        self.topology.remove_devices(device_ids, &mut self.site)
    }

    /// Start over: empty topology, empty site, no images.
    pub fn clear(&mut self) {
        self.topology.clear_all();
        self.site.clear_all();
        self.images.clear();
    }

    // ── Cross-store queries ──────────────────────────────────────────

    /// Set the alias of a placed device, wherever it is placed.
    pub fn set_alias(&mut self, mac: &MacAddress, alias: &str) -> Result<(), CoreError> {
        let location = self
            .site
            .state()
            .find_node_location(mac)
            .ok_or_else(|| CoreError::NodeNotPlaced {
                mac: mac.to_string(),
                floor: "any floor".into(),
            })?;
        self.site.set_node_description(location.floor_id, mac, alias)
    }

    pub fn locate(&self, mac: &MacAddress) -> Location {
        let known = self.topology.state().device(mac).is_some();
        match self.site.state().find_node_location(mac) {
            Some(location) if known => Location::Placed(location),
            Some(location) => Location::Orphaned(location),
            None => Location::NotDeployed,
        }
    }

    /// Inconsistencies that do not block any operation.
    pub fn consistency_notices(&self) -> Vec<Notice> {
        let topology = self.topology.state();
        let site = self.site.state();

        let mut floors_per_device: BTreeMap<&MacAddress, usize> = BTreeMap::new();
        let mut notices = Vec::new();
        for (location, node) in site.placements() {
            *floors_per_device.entry(&node.id).or_default() += 1;
            if topology.device(&node.id).is_none() {
                notices.push(Notice::UnknownPlacement {
                    mac: node.id.clone(),
                    floor_id: location.floor_id,
                });
            }
        }
        notices.extend(
            floors_per_device
                .into_iter()
                .filter(|(_, floors)| *floors > 1)
                .map(|(mac, floors)| Notice::MultipleFloors {
                    mac: mac.clone(),
                    floors,
                }),
        );

        for notice in &notices {
            warn!(%notice, "consistency notice");
        }
        notices
    }
}
