#![allow(clippy::unwrap_used)]
// End-to-end tests: parse an export, reconcile, place, save, reload.

use pretty_assertions::assert_eq;

use meshplan_core::parse::parse_topology;
use meshplan_core::tree::build_topology_tree;
use meshplan_core::{CoreError, DeviceStatus, Location, LoopId, MacAddress, Project, ProjectFile};

const LOOP_V1: &str = r#"{
    "devices": [
        {"id": 1, "mac": "AA:00:00:00:00:01", "role": "Leader", "label": "Gateway"},
        {"id": 2, "mac": "AA:00:00:00:00:02", "role": "Router"},
        {"id": 3, "mac": "AA:00:00:00:00:03", "role": "End Device"}
    ],
    "edges": [
        {"from": 1, "to": 2, "rssi": -52},
        {"from": 2, "to": 3, "rssi": -67}
    ]
}"#;

const LOOP_V2_HTML: &str = r#"<html><body><script>
    var nodes = [
        {"id": 1, "mac": "aa-00-00-00-00-01", "role": "Leader"},
        {"id": 2, "mac": "aa-00-00-00-00-02", "role": "Router"},
        {"id": 4, "mac": "aa-00-00-00-00-04", "role": "End Device"}
    ];
    var edges = [{"from": 1, "to": 2}, {"from": 2, "to": 4}];
</script></body></html>"#;

fn mac(s: &str) -> MacAddress {
    MacAddress::new(s)
}

#[test]
fn import_place_reimport_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site").join("project.json");
    let loop_id = LoopId::new(2).unwrap();

    let mut project = Project::new();
    let summary = project
        .import_loop(loop_id, parse_topology(LOOP_V1, "loop2.json").unwrap())
        .unwrap();
    assert_eq!(summary.added.len(), 3);

    let building = project.site_mut().add_building(None);
    let floor = project.site_mut().add_floor(building, None).unwrap();
    project
        .site_mut()
        .place_node(floor, &mac("AA:00:00:00:00:03"), 120.0, 80.0)
        .unwrap();
    project.set_alias(&mac("aa:00:00:00:00:03"), "Lobby Sensor").unwrap();
    project.save(&path).unwrap();

    // Re-import from a differently formatted export: device 3 drops out.
    let mut project = Project::load(&path).unwrap();
    let summary = project
        .import_loop(loop_id, parse_topology(LOOP_V2_HTML, "loop2.html").unwrap())
        .unwrap();
    assert_eq!(summary.updated.len(), 2);
    assert_eq!(summary.added, vec![mac("aa:00:00:00:00:04")]);
    assert_eq!(summary.missing, vec![mac("aa:00:00:00:00:03")]);

    let state = project.topology().state();
    let ghost = state.device(&mac("AA:00:00:00:00:03")).unwrap();
    assert_eq!(ghost.status, DeviceStatus::Missing);
    assert!(matches!(project.locate(&ghost.mac), Location::Placed(_)));
    assert_eq!(
        project.site().state().find_node_description(&ghost.mac),
        Some("Lobby Sensor")
    );
    project.save(&path).unwrap();

    // Clearing the ghost removes its placement too, and survives a reload.
    let mut project = Project::load(&path).unwrap();
    let report = project.clear_missing(loop_id);
    assert_eq!(report.placements_removed, 1);
    project.save(&path).unwrap();

    let project = Project::load(&path).unwrap();
    assert!(project.topology().state().device(&mac("aa:00:00:00:00:03")).is_none());
    assert!(project.site().state().placements().next().is_none());
    assert!(project.consistency_notices().is_empty());
}

#[test]
fn tree_of_imported_loop_resolves_numeric_edges() {
    let loop_id = LoopId::new(1).unwrap();
    let mut project = Project::new();
    project
        .import_loop(loop_id, parse_topology(LOOP_V1, "loop.json").unwrap())
        .unwrap();

    let state = project.topology().state();
    let devices: Vec<_> = state.loop_devices(loop_id).cloned().collect();
    let edges: Vec<_> = state.loop_edges(loop_id).cloned().collect();
    let tree = build_topology_tree(&devices, &edges);

    assert_eq!(tree.roots.len(), 2);
    assert_eq!(tree.roots[0].label.as_deref(), Some("Gateway"));
    assert_eq!(tree.roots[1].children.len(), 1);
    assert_eq!(tree.roots[1].children[0].uplink_rssi, Some(-67.0));
    assert!(tree.orphans.is_empty());
}

#[test]
fn malformed_project_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"version\": \"1.0\", \"timestamp\": ").unwrap();

    assert!(matches!(Project::load(&path), Err(CoreError::Project { .. })));
    assert!(matches!(
        ProjectFile::load(&dir.path().join("absent.json")),
        Err(CoreError::Io(_))
    ));
}
