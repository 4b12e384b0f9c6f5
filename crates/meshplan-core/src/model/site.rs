// ── Spatial domain types ──

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::MacAddress;

/// Default floor height (cm).
pub const DEFAULT_FLOOR_HEIGHT: f64 = 300.0;

/// A building: an ordered list of floors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub floors: Vec<Floor>,
}

/// A floor and the devices placed on its plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub id: Uuid,
    pub name: String,
    pub level_index: i32,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_scale")]
    pub scale_ratio: f64,
    /// Key of the floor-plan image in the project's image table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_px: Option<u32>,
    #[serde(default)]
    pub nodes: Vec<PlacedNode>,
}

fn default_height() -> f64 {
    DEFAULT_FLOOR_HEIGHT
}

fn default_scale() -> f64 {
    1.0
}

impl Floor {
    pub fn new(name: impl Into<String>, level_index: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            level_index,
            height: DEFAULT_FLOOR_HEIGHT,
            scale_ratio: 1.0,
            map_id: None,
            width: None,
            height_px: None,
            nodes: Vec::new(),
        }
    }

    pub fn node(&self, mac: &MacAddress) -> Option<&PlacedNode> {
        self.nodes.iter().find(|n| n.id == *mac)
    }

    pub(crate) fn node_mut(&mut self, mac: &MacAddress) -> Option<&mut PlacedNode> {
        self.nodes.iter_mut().find(|n| n.id == *mac)
    }
}

/// A device's position on one floor. Its id is the device's MAC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNode {
    pub id: MacAddress,
    pub x: f64,
    pub y: f64,
    /// User alias, unique across the whole site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Where a device is placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLocation {
    pub building_id: Uuid,
    pub floor_id: Uuid,
    pub x: f64,
    pub y: f64,
}
