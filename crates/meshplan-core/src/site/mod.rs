// ── Site store ──
//
// Owns the spatial model: buildings, floors and device placements. Like
// the topology store, every operation commits one complete next state.
// The site store never calls back into the topology.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Building, Floor, MacAddress, NodeLocation, PlacedNode};
use crate::stream::{Published, SnapshotStream};
use crate::topology::PlacementSink;

/// Committed spatial state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteState {
    #[serde(default)]
    pub buildings: Vec<Building>,
}

/// Partial floor update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorUpdate {
    pub name: Option<String>,
    pub level_index: Option<i32>,
    pub height: Option<f64>,
    pub scale_ratio: Option<f64>,
    pub map_id: Option<String>,
    pub width: Option<u32>,
    pub height_px: Option<u32>,
}

impl FloorUpdate {
    fn apply(self, floor: &mut Floor) {
        if let Some(name) = self.name {
            floor.name = name;
        }
        if let Some(level) = self.level_index {
            floor.level_index = level;
        }
        if let Some(height) = self.height {
            floor.height = height;
        }
        if let Some(ratio) = self.scale_ratio {
            floor.scale_ratio = ratio;
        }
        if self.map_id.is_some() {
            floor.map_id = self.map_id;
        }
        if self.width.is_some() {
            floor.width = self.width;
        }
        if self.height_px.is_some() {
            floor.height_px = self.height_px;
        }
    }
}

// ── Queries ─────────────────────────────────────────────────────────

impl SiteState {
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn building(&self, id: Uuid) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Look up a floor anywhere in the site.
    pub fn floor(&self, id: Uuid) -> Option<&Floor> {
        self.floors().map(|(_, f)| f).find(|f| f.id == id)
    }

    /// Every floor with its building id, in display order.
    pub fn floors(&self) -> impl Iterator<Item = (Uuid, &Floor)> {
        self.buildings
            .iter()
            .flat_map(|b| b.floors.iter().map(move |f| (b.id, f)))
    }

    /// Every placement with its location, in display order.
    pub fn placements(&self) -> impl Iterator<Item = (NodeLocation, &PlacedNode)> {
        self.floors().flat_map(|(building_id, floor)| {
            floor.nodes.iter().map(move |n| {
                let location = NodeLocation {
                    building_id,
                    floor_id: floor.id,
                    x: n.x,
                    y: n.y,
                };
                (location, n)
            })
        })
    }

    /// First placement of `mac`, if any.
    pub fn find_node_location(&self, mac: &MacAddress) -> Option<NodeLocation> {
        self.placements()
            .find(|(_, n)| n.id == *mac)
            .map(|(location, _)| location)
    }

    pub fn is_node_deployed(&self, mac: &MacAddress) -> bool {
        self.placements().any(|(_, n)| n.id == *mac)
    }

    pub fn find_node_description(&self, mac: &MacAddress) -> Option<&str> {
        self.placements()
            .filter(|(_, n)| n.id == *mac)
            .find_map(|(_, n)| n.description.as_deref())
    }

    /// Every alias in the site, keyed by device.
    pub fn all_node_descriptions(&self) -> HashMap<MacAddress, String> {
        self.placements()
            .filter_map(|(_, n)| n.description.clone().map(|d| (n.id.clone(), d)))
            .collect()
    }

    /// Whether `candidate` is free to use as an alias.
    ///
    /// Compared case-insensitively against every placement except `exclude`.
    pub fn check_description_unique(&self, candidate: &str, exclude: Option<&MacAddress>) -> bool {
        let wanted = candidate.trim().to_lowercase();
        !self.placements().any(|(_, n)| {
            exclude != Some(&n.id)
                && n.description
                    .as_deref()
                    .is_some_and(|d| d.trim().to_lowercase() == wanted)
        })
    }

    fn building_mut(&mut self, id: Uuid) -> Result<&mut Building, CoreError> {
        self.buildings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| CoreError::BuildingNotFound { id: id.to_string() })
    }

    fn floor_mut(&mut self, id: Uuid) -> Result<&mut Floor, CoreError> {
        self.buildings
            .iter_mut()
            .flat_map(|b| b.floors.iter_mut())
            .find(|f| f.id == id)
            .ok_or_else(|| CoreError::FloorNotFound { id: id.to_string() })
    }
}

// ── Store ───────────────────────────────────────────────────────────

/// Single owner of the site state.
#[derive(Debug)]
pub struct SiteStore {
    state: Published<SiteState>,
}

impl Default for SiteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteStore {
    pub fn new() -> Self {
        Self::from_state(SiteState::default())
    }

    pub fn from_state(state: SiteState) -> Self {
        Self {
            state: Published::new(state),
        }
    }

    pub fn state(&self) -> Arc<SiteState> {
        self.state.get()
    }

    pub fn subscribe(&self) -> SnapshotStream<SiteState> {
        self.state.subscribe()
    }

    /// Clone the current state, let `f` edit it, commit only on success.
    fn update<R>(
        &mut self,
        f: impl FnOnce(&mut SiteState) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let mut next = SiteState::clone(&self.state.get());
        let out = f(&mut next)?;
        self.state.commit(next);
        Ok(out)
    }

    // ── Buildings ────────────────────────────────────────────────────

    /// Add a building; unnamed ones are called "Building N".
    pub fn add_building(&mut self, name: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        let mut next = SiteState::clone(&self.state.get());
        let name = non_blank(name)
            .map_or_else(|| format!("Building {}", next.buildings.len() + 1), str::to_owned);
        info!(%id, %name, "building added");
        next.buildings.push(Building {
            id,
            name,
            floors: Vec::new(),
        });
        self.state.commit(next);
        id
    }

    pub fn remove_building(&mut self, id: Uuid) -> Result<(), CoreError> {
        self.update(|s| {
            let before = s.buildings.len();
            s.buildings.retain(|b| b.id != id);
            if s.buildings.len() == before {
                return Err(CoreError::BuildingNotFound { id: id.to_string() });
            }
            Ok(())
        })
    }

    pub fn rename_building(&mut self, id: Uuid, name: &str) -> Result<(), CoreError> {
        self.update(|s| {
            s.building_mut(id)?.name = name.trim().to_owned();
            Ok(())
        })
    }

    // ── Floors ───────────────────────────────────────────────────────

    /// Add a floor above the highest existing one. Unnamed floors are
    /// called "{level + 1}F".
    pub fn add_floor(&mut self, building_id: Uuid, name: Option<&str>) -> Result<Uuid, CoreError> {
        self.update(|s| {
            let building = s.building_mut(building_id)?;
            let level = building
                .floors
                .iter()
                .map(|f| f.level_index)
                .max()
                .map_or(0, |max| max + 1);
            let name = non_blank(name).map_or_else(|| format!("{}F", level + 1), str::to_owned);
            let floor = Floor::new(name, level);
            let id = floor.id;
            debug!(%building_id, floor_id = %id, level, "floor added");
            building.floors.push(floor);
            Ok(id)
        })
    }

    pub fn remove_floor(&mut self, building_id: Uuid, floor_id: Uuid) -> Result<(), CoreError> {
        self.update(|s| {
            let building = s.building_mut(building_id)?;
            let before = building.floors.len();
            building.floors.retain(|f| f.id != floor_id);
            if building.floors.len() == before {
                return Err(CoreError::FloorNotFound {
                    id: floor_id.to_string(),
                });
            }
            Ok(())
        })
    }

    pub fn update_floor(
        &mut self,
        building_id: Uuid,
        floor_id: Uuid,
        update: FloorUpdate,
    ) -> Result<(), CoreError> {
        self.update(|s| {
            let floor = s
                .building_mut(building_id)?
                .floors
                .iter_mut()
                .find(|f| f.id == floor_id)
                .ok_or_else(|| CoreError::FloorNotFound {
                    id: floor_id.to_string(),
                })?;
            update.apply(floor);
            Ok(())
        })
    }

    // ── Placements ───────────────────────────────────────────────────

    /// Put `mac` at `(x, y)` on a floor.
    ///
    /// A device already on another floor moves here together with its
    /// alias, so it is never on two floors at once.
    pub fn place_node(
        &mut self,
        floor_id: Uuid,
        mac: &MacAddress,
        x: f64,
        y: f64,
    ) -> Result<(), CoreError> {
        self.update(|s| {
            s.floor_mut(floor_id)?;

            let mut description = None;
            for floor in s.buildings.iter_mut().flat_map(|b| b.floors.iter_mut()) {
                if floor.id == floor_id {
                    continue;
                }
                if let Some(pos) = floor.nodes.iter().position(|n| n.id == *mac) {
                    let moved = floor.nodes.remove(pos);
                    debug!(%mac, from = %floor.id, to = %floor_id, "placement moved");
                    description = description.or(moved.description);
                }
            }

            let floor = s.floor_mut(floor_id)?;
            if let Some(node) = floor.node_mut(mac) {
                node.x = x;
                node.y = y;
                if node.description.is_none() {
                    node.description = description;
                }
            } else {
                floor.nodes.push(PlacedNode {
                    id: mac.clone(),
                    x,
                    y,
                    description,
                });
            }
            Ok(())
        })
    }

    /// Set or clear (empty string) a placed device's alias.
    ///
    /// Fails without changing anything if another device already uses the
    /// alias.
    pub fn set_node_description(
        &mut self,
        floor_id: Uuid,
        mac: &MacAddress,
        alias: &str,
    ) -> Result<(), CoreError> {
        let alias = alias.trim();
        self.update(|s| {
            if !alias.is_empty() && !s.check_description_unique(alias, Some(mac)) {
                return Err(CoreError::AliasTaken {
                    alias: alias.to_owned(),
                });
            }
            let node = s
                .floor_mut(floor_id)?
                .node_mut(mac)
                .ok_or_else(|| CoreError::NodeNotPlaced {
                    mac: mac.to_string(),
                    floor: floor_id.to_string(),
                })?;
            node.description = (!alias.is_empty()).then(|| alias.to_owned());
            Ok(())
        })
    }

    /// Take a device off one floor. Returns whether it was there.
    pub fn remove_node_from_floor(
        &mut self,
        floor_id: Uuid,
        mac: &MacAddress,
    ) -> Result<bool, CoreError> {
        let current = self.state.get();
        let floor = current.floor(floor_id).ok_or_else(|| CoreError::FloorNotFound {
            id: floor_id.to_string(),
        })?;
        if floor.node(mac).is_none() {
            return Ok(false);
        }
        self.update(|s| {
            s.floor_mut(floor_id)?.nodes.retain(|n| n.id != *mac);
            Ok(true)
        })
    }

    /// Drop every placement of the given devices on every floor.
    pub fn remove_nodes_by_device_ids(&mut self, device_ids: &[MacAddress]) -> usize {
        if device_ids.is_empty() {
            return 0;
        }
        let mut next = SiteState::clone(&self.state.get());
        let mut removed = 0;
        for floor in next.buildings.iter_mut().flat_map(|b| b.floors.iter_mut()) {
            let before = floor.nodes.len();
            floor.nodes.retain(|n| !device_ids.contains(&n.id));
            removed += before - floor.nodes.len();
        }
        if removed > 0 {
            self.state.commit(next);
            info!(devices = device_ids.len(), placements = removed, "placements purged");
        }
        removed
    }

    /// Drop everything.
    pub fn clear_all(&mut self) {
        self.state.commit(SiteState::default());
    }
}

impl PlacementSink for SiteStore {
    fn remove_placements(&mut self, device_ids: &[MacAddress]) -> usize {
        self.remove_nodes_by_device_ids(device_ids)
    }
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn mac(s: &str) -> MacAddress {
        MacAddress::new(s)
    }

    fn store_with_floors() -> (SiteStore, Uuid, Uuid, Uuid) {
        let mut store = SiteStore::new();
        let building = store.add_building(None);
        let f1 = store.add_floor(building, None).unwrap();
        let f2 = store.add_floor(building, None).unwrap();
        (store, building, f1, f2)
    }

    #[test]
    fn default_names_and_levels() {
        let (store, building, f1, f2) = store_with_floors();
        let state = store.state();
        let b = state.building(building).unwrap();
        assert_eq!(b.name, "Building 1");
        assert_eq!(state.floor(f1).unwrap().name, "1F");
        assert_eq!(state.floor(f2).unwrap().name, "2F");
        assert_eq!(state.floor(f2).unwrap().level_index, 1);
        assert_eq!(state.floor(f2).unwrap().height, 300.0);
    }

    #[test]
    fn add_floor_to_unknown_building_fails() {
        let mut store = SiteStore::new();
        let err = store.add_floor(Uuid::new_v4(), Some("Roof")).unwrap_err();
        assert!(matches!(err, CoreError::BuildingNotFound { .. }));
        assert!(store.state().buildings.is_empty());
    }

    #[test]
    fn update_floor_is_partial() {
        let (mut store, building, f1, _) = store_with_floors();
        store
            .update_floor(
                building,
                f1,
                FloorUpdate {
                    name: Some("Lobby".into()),
                    scale_ratio: Some(2.5),
                    ..FloorUpdate::default()
                },
            )
            .unwrap();
        let state = store.state();
        let floor = state.floor(f1).unwrap();
        assert_eq!(floor.name, "Lobby");
        assert_eq!(floor.scale_ratio, 2.5);
        assert_eq!(floor.level_index, 0);
    }

    #[test]
    fn place_node_upserts_and_locates() {
        let (mut store, building, f1, _) = store_with_floors();
        store.place_node(f1, &mac("aa:01"), 10.0, 20.0).unwrap();
        store.place_node(f1, &mac("AA:01"), 15.0, 25.0).unwrap();

        let state = store.state();
        assert_eq!(state.floor(f1).unwrap().nodes.len(), 1);
        let location = state.find_node_location(&mac("aa-01")).unwrap();
        assert_eq!(location.building_id, building);
        assert_eq!(location.floor_id, f1);
        assert_eq!((location.x, location.y), (15.0, 25.0));
        assert!(state.is_node_deployed(&mac("aa:01")));
        assert!(!state.is_node_deployed(&mac("aa:02")));
    }

    #[test]
    fn place_node_moves_between_floors_with_alias() {
        let (mut store, _, f1, f2) = store_with_floors();
        store.place_node(f1, &mac("aa:01"), 1.0, 1.0).unwrap();
        store.set_node_description(f1, &mac("aa:01"), "Stairwell").unwrap();

        store.place_node(f2, &mac("aa:01"), 5.0, 5.0).unwrap();

        let state = store.state();
        assert!(state.floor(f1).unwrap().nodes.is_empty());
        let node = state.floor(f2).unwrap().node(&mac("aa:01")).unwrap();
        assert_eq!(node.description.as_deref(), Some("Stairwell"));
    }

    #[test]
    fn place_node_on_unknown_floor_fails_without_commit() {
        let (mut store, _, f1, _) = store_with_floors();
        store.place_node(f1, &mac("aa:01"), 1.0, 1.0).unwrap();
        let before = store.state();

        let err = store
            .place_node(Uuid::new_v4(), &mac("aa:01"), 2.0, 2.0)
            .unwrap_err();
        assert!(matches!(err, CoreError::FloorNotFound { .. }));
        assert_eq!(*store.state(), *before);
    }

    #[test]
    fn duplicate_alias_is_rejected_and_prior_alias_kept() {
        let (mut store, _, f1, f2) = store_with_floors();
        store.place_node(f1, &mac("A"), 0.0, 0.0).unwrap();
        store.place_node(f2, &mac("B"), 0.0, 0.0).unwrap();
        store.set_node_description(f1, &mac("A"), "Lobby Sensor").unwrap();
        store.set_node_description(f2, &mac("B"), "Hall").unwrap();

        let err = store
            .set_node_description(f2, &mac("B"), "lobby sensor")
            .unwrap_err();
        assert!(matches!(err, CoreError::AliasTaken { .. }));
        assert_eq!(store.state().find_node_description(&mac("B")), Some("Hall"));
    }

    #[test]
    fn device_may_keep_its_own_alias() {
        let (mut store, _, f1, _) = store_with_floors();
        store.place_node(f1, &mac("A"), 0.0, 0.0).unwrap();
        store.set_node_description(f1, &mac("A"), "Lobby Sensor").unwrap();
        store.set_node_description(f1, &mac("A"), "LOBBY SENSOR").unwrap();
        assert!(store.state().check_description_unique("Lobby Sensor", Some(&mac("A"))));
        assert!(!store.state().check_description_unique("Lobby Sensor", None));
    }

    #[test]
    fn empty_alias_clears() {
        let (mut store, _, f1, _) = store_with_floors();
        store.place_node(f1, &mac("A"), 0.0, 0.0).unwrap();
        store.set_node_description(f1, &mac("A"), "Desk").unwrap();
        store.set_node_description(f1, &mac("A"), "  ").unwrap();
        assert!(store.state().all_node_descriptions().is_empty());
    }

    #[test]
    fn alias_requires_placement() {
        let (mut store, _, f1, _) = store_with_floors();
        let err = store.set_node_description(f1, &mac("A"), "Desk").unwrap_err();
        assert!(matches!(err, CoreError::NodeNotPlaced { .. }));
    }

    #[test]
    fn remove_nodes_by_device_ids_spans_floors() {
        let (mut store, _, f1, f2) = store_with_floors();
        store.place_node(f1, &mac("a"), 0.0, 0.0).unwrap();
        store.place_node(f2, &mac("b"), 0.0, 0.0).unwrap();
        store.place_node(f2, &mac("c"), 0.0, 0.0).unwrap();

        let removed = store.remove_nodes_by_device_ids(&[mac("A"), mac("B"), mac("zz")]);
        assert_eq!(removed, 2);
        let state = store.state();
        assert!(!state.is_node_deployed(&mac("a")));
        assert!(!state.is_node_deployed(&mac("b")));
        assert!(state.is_node_deployed(&mac("c")));
    }

    #[test]
    fn remove_nodes_without_match_does_not_commit() {
        let (mut store, _, _, _) = store_with_floors();
        let stream = store.subscribe();
        assert_eq!(store.remove_nodes_by_device_ids(&[mac("x")]), 0);
        assert!(!stream.has_changed());
    }

    #[test]
    fn remove_node_from_floor_reports_presence() {
        let (mut store, _, f1, _) = store_with_floors();
        store.place_node(f1, &mac("a"), 0.0, 0.0).unwrap();
        assert!(store.remove_node_from_floor(f1, &mac("a")).unwrap());
        assert!(!store.remove_node_from_floor(f1, &mac("a")).unwrap());
    }

    #[test]
    fn all_node_descriptions_maps_mac_to_alias() {
        let (mut store, _, f1, f2) = store_with_floors();
        store.place_node(f1, &mac("a"), 0.0, 0.0).unwrap();
        store.place_node(f2, &mac("b"), 0.0, 0.0).unwrap();
        store.set_node_description(f2, &mac("b"), "Garage").unwrap();

        let aliases = store.state().all_node_descriptions();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.get(&mac("B")).map(String::as_str), Some("Garage"));
    }

    #[test]
    fn remove_building_and_floor() {
        let (mut store, building, f1, _) = store_with_floors();
        store.remove_floor(building, f1).unwrap();
        assert!(store.state().floor(f1).is_none());
        assert!(store.remove_floor(building, f1).is_err());

        store.rename_building(building, " North Wing ").unwrap();
        assert_eq!(store.state().buildings[0].name, "North Wing");

        store.remove_building(building).unwrap();
        assert!(store.state().buildings.is_empty());
        assert!(store.remove_building(building).is_err());
    }

    #[test]
    fn site_state_json_is_camel_case() {
        let (mut store, _, f1, _) = store_with_floors();
        store.place_node(f1, &mac("a"), 1.0, 2.0).unwrap();
        let value = serde_json::to_value(&*store.state()).unwrap();
        let floor = &value["buildings"][0]["floors"][0];
        assert_eq!(floor["levelIndex"], serde_json::json!(0));
        assert_eq!(floor["scaleRatio"], serde_json::json!(1.0));
        assert_eq!(floor["nodes"][0]["id"], serde_json::json!("a"));
    }
}
