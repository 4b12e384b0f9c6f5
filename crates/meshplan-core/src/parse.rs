// ── Vendor topology export parsing ──
//
// Two input shapes are understood:
//
// - JSON documents with a device list under `devices` or `nodes` and an
//   edge list under `edges` or `links`.
// - HTML/text reports whose scripts carry the data as JavaScript literals.
//   Three passes run in order: `nodes = [...]` / `edges = [...]`
//   assignments, then vis.js `.nodes.add([...])` / `.edges.add([...])`
//   calls, and only if both found nothing, every object literal that looks
//   like a device or an edge. Literals are read as JSON, else as JSON5
//   (unquoted keys, single quotes, trailing commas); the rest is skipped
//   with a warning.
//
// Parsing never touches store state.

use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DeviceRecord, Edge, MacAddress, ParsedTopology};

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "txt"];

/// Read and parse an export from disk.
pub fn read_topology(path: &Path) -> Result<ParsedTopology, CoreError> {
    let content = std::fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_topology(&content, &name)
}

/// Parse an export; `file_name` selects the input shape by extension.
pub fn parse_topology(content: &str, file_name: &str) -> Result<ParsedTopology, CoreError> {
    let is_markup = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MARKUP_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));

    let (raw_devices, raw_edges) = if is_markup {
        markup_lists(content)
    } else {
        json_lists(content, file_name)?
    };

    let devices = collect_devices(raw_devices);
    if devices.is_empty() {
        return Err(CoreError::Parse {
            message: format!("no devices found in {file_name}"),
        });
    }
    let edges = collect_edges(raw_edges);

    debug!(
        file = file_name,
        devices = devices.len(),
        edges = edges.len(),
        "topology parsed"
    );
    Ok(ParsedTopology { devices, edges })
}

fn json_lists(content: &str, file_name: &str) -> Result<(Vec<Value>, Vec<Value>), CoreError> {
    let doc: Value = serde_json::from_str(content).map_err(|e| CoreError::Parse {
        message: format!("invalid JSON in {file_name}: {e}"),
    })?;
    let Value::Object(mut obj) = doc else {
        return Err(CoreError::Parse {
            message: format!("{file_name}: expected a JSON object"),
        });
    };

    let mut take_list = |keys: [&str; 2]| {
        keys.iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default()
    };
    let devices = take_list(["devices", "nodes"]);
    let edges = take_list(["edges", "links"]);
    Ok((devices, edges))
}

/// Devices keyed by MAC: first position, last value.
fn collect_devices(raw: Vec<Value>) -> Vec<DeviceRecord> {
    let mut unique: IndexMap<MacAddress, DeviceRecord> = IndexMap::new();
    let mut skipped = 0_usize;
    for value in raw {
        match DeviceRecord::from_value(value) {
            Some(record) => {
                unique.insert(record.mac.clone(), record);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "device entries without mac or id were skipped");
    }
    unique.into_values().collect()
}

fn collect_edges(raw: Vec<Value>) -> Vec<Edge> {
    let mut skipped = 0_usize;
    let edges = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Edge>(value) {
            Ok(edge) => Some(edge),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        warn!(skipped, "edge entries without both endpoints were skipped");
    }
    edges
}

// ── Script literal extraction ───────────────────────────────────────

/// Raw device and edge values found in an HTML/text report.
fn markup_lists(content: &str) -> (Vec<Value>, Vec<Value>) {
    let mut devices = script_arrays(content, "nodes");
    let mut edges = script_arrays(content, "edges");

    for batch in dataset_additions(content) {
        match classify_batch(&batch) {
            Some(Kind::Device) => devices.extend(batch),
            Some(Kind::Edge) => edges.extend(batch),
            None => debug!(items = batch.len(), "dataset addition of unknown shape ignored"),
        }
    }

    if devices.is_empty() && edges.is_empty() {
        for (kind, value) in mined_objects(content) {
            match kind {
                Kind::Device => devices.push(value),
                Kind::Edge => edges.push(value),
            }
        }
    }
    (devices, edges)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Device,
    Edge,
}

/// Every `<name> = [ ... ]` array in `content`, flattened in document order.
fn script_arrays(content: &str, name: &str) -> Vec<Value> {
    let mut items = Vec::new();
    for (start, _) in content.match_indices(name) {
        let before = content[..start].chars().next_back();
        if before.is_some_and(is_ident_char) {
            continue;
        }
        let Some(open) = array_after_assignment(content, start + name.len()) else {
            continue;
        };
        if let Some(values) = array_at(content, open, name) {
            items.extend(values);
        }
    }
    items
}

/// Arrays passed to `.nodes.add(...)` or `.edges.add(...)`, in document order.
fn dataset_additions(content: &str) -> Vec<Vec<Value>> {
    let mut calls: Vec<(usize, &str)> = [".nodes.add(", ".edges.add("]
        .into_iter()
        .flat_map(|marker| content.match_indices(marker))
        .collect();
    calls.sort_unstable_by_key(|(offset, _)| *offset);

    calls
        .into_iter()
        .filter_map(|(offset, marker)| {
            let after = &content[offset + marker.len()..];
            let trimmed = after.trim_start();
            if !trimmed.starts_with('[') {
                return None;
            }
            array_at(content, content.len() - trimmed.len(), marker)
        })
        .filter(|values| !values.is_empty())
        .collect()
}

/// A dataset batch is devices when its first item has a `mac` or `label`,
/// edges when it has both `from` and `to`.
fn classify_batch(batch: &[Value]) -> Option<Kind> {
    let first = batch.first()?;
    if truthy(first.get("mac")) || truthy(first.get("label")) {
        Some(Kind::Device)
    } else if truthy(first.get("from")) && truthy(first.get("to")) {
        Some(Kind::Edge)
    } else {
        None
    }
}

/// Last-resort scan over every object literal in `content`.
///
/// An object counts as a device when it has a `mac`, or both an `id` and a
/// `label`; as an edge when it has `from` and `to`. Objects of neither shape
/// are searched for nested candidates.
fn mined_objects(content: &str) -> Vec<(Kind, Value)> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(rel) = content[cursor..].find('{') {
        let open = cursor + rel;
        cursor = open + 1;

        let Some(snippet) = balanced(&content[open..], '{', '}') else {
            continue;
        };
        if !snippet.contains("mac") && !snippet.contains("from") {
            cursor = open + snippet.len();
            continue;
        }
        let Some(value) = lenient::<Value>(snippet) else {
            continue;
        };
        let kind = if truthy(value.get("mac"))
            || (truthy(value.get("id")) && truthy(value.get("label")))
        {
            Kind::Device
        } else if value.get("from").is_some() && value.get("to").is_some() {
            Kind::Edge
        } else {
            continue;
        };
        cursor = open + snippet.len();
        found.push((kind, value));
    }
    if !found.is_empty() {
        debug!(objects = found.len(), "topology mined from loose object literals");
    }
    found
}

/// Parse the array literal starting at byte `open` of `content`.
fn array_at(content: &str, open: usize, context: &str) -> Option<Vec<Value>> {
    let Some(literal) = balanced(&content[open..], '[', ']') else {
        warn!(array = context, offset = open, "unterminated script array skipped");
        return None;
    };
    let values = lenient::<Vec<Value>>(literal);
    if values.is_none() {
        warn!(array = context, offset = open, "script array is not a data literal, skipped");
    }
    values
}

/// Read a JavaScript data literal: strict JSON first, then JSON5.
fn lenient<T: DeserializeOwned>(literal: &str) -> Option<T> {
    serde_json::from_str(literal)
        .ok()
        .or_else(|| json5::from_str(literal).ok())
}

/// JavaScript truthiness of an optional field.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte offset of the `[` in `= [`, if `rest` continues with an assignment.
fn array_after_assignment(content: &str, from: usize) -> Option<usize> {
    let rest = &content[from..];
    let after_name = rest.trim_start();
    if after_name.starts_with(is_ident_char) {
        return None;
    }
    let after_eq = after_name.strip_prefix('=')?;
    if after_eq.starts_with('=') {
        return None;
    }
    let after_ws = after_eq.trim_start();
    after_ws
        .starts_with('[')
        .then(|| content.len() - after_ws.len())
}

/// The balanced `open`..`close` literal at the start of `s`, skipping over
/// delimiters inside string literals.
fn balanced(s: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c == '"' || c == '\'' || c == '`' {
            quote = Some(c);
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(&s[..=i]);
            }
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DeviceRole;

    #[test]
    fn json_with_devices_and_edges() {
        let parsed = parse_topology(
            r#"{
                "devices": [
                    {"mac": "AA:01", "type": "Leader"},
                    {"mac": "AA:02", "role": "router", "rssi": -55}
                ],
                "edges": [{"from": "AA:01", "to": "AA:02", "rssi": -55}]
            }"#,
            "scan.json",
        )
        .unwrap();

        assert_eq!(parsed.devices.len(), 2);
        assert_eq!(parsed.devices[0].role, DeviceRole::Leader);
        assert_eq!(parsed.devices[1].role, DeviceRole::Router);
        assert_eq!(parsed.edges.len(), 1);
    }

    #[test]
    fn json_with_nodes_and_links() {
        let parsed = parse_topology(
            r#"{"nodes": [{"id": 1, "role": "leader"}],
                "links": [{"sourceId": 1, "targetId": 2}]}"#,
            "export",
        )
        .unwrap();
        assert_eq!(parsed.devices[0].mac.as_str(), "1");
        assert_eq!(parsed.edges[0].to, "2");
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_topology("{ nope", "scan.json").unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
    }

    #[test]
    fn zero_devices_is_a_parse_error() {
        let err = parse_topology(r#"{"devices": [], "edges": []}"#, "scan.json").unwrap_err();
        match err {
            CoreError::Parse { message } => assert!(message.contains("no devices found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicates_keep_first_position_and_last_value() {
        let parsed = parse_topology(
            r#"{"devices": [
                {"mac": "aa:01", "role": "child", "label": "old"},
                {"mac": "aa:02", "role": "child"},
                {"mac": "AA:01", "role": "child", "label": "new"}
            ]}"#,
            "scan.json",
        )
        .unwrap();
        assert_eq!(parsed.devices.len(), 2);
        assert_eq!(parsed.devices[0].label.as_deref(), Some("new"));
    }

    #[test]
    fn edges_without_endpoints_are_skipped() {
        let parsed = parse_topology(
            r#"{"devices": [{"mac": "a"}], "edges": [{"from": "a"}, {"from": "a", "to": "b"}]}"#,
            "scan.json",
        )
        .unwrap();
        assert_eq!(parsed.edges.len(), 1);
    }

    #[test]
    fn html_script_arrays() {
        let html = r#"
            <html><script>
            var nodes = [
                {"id": 1, "mac": "AA:01", "role": "Leader", "label": "GW [main]"},
                {"id": 2, "mac": "AA:02", "role": "Router"}
            ];
            var edges = [{"from": 1, "to": 2, "linkQuality": 0.9}];
            var network = new vis.Network(container, { nodes: nodes, edges: edges });
            </script></html>
        "#;
        let parsed = parse_topology(html, "report.HTML").unwrap();
        assert_eq!(parsed.devices.len(), 2);
        assert_eq!(parsed.devices[0].label.as_deref(), Some("GW [main]"));
        assert_eq!(parsed.edges.len(), 1);
        assert_eq!(parsed.edges[0].from, "1");
    }

    #[test]
    fn html_loose_js_literals_are_read() {
        let html = r#"
            window.nodes = [{mac: 'AA:09', role: 'leader', label: "Gateway"},];
            let myedges = [{"from": "x", "to": "y"}];
            const edges = [
                // vis.js style
                {from: 'AA:09', to: 'AA:0A', linkQuality: .8},
            ];
        "#;
        let parsed = parse_topology(html, "dump.txt").unwrap();
        assert_eq!(parsed.devices.len(), 1);
        assert_eq!(parsed.devices[0].mac.as_str(), "AA:09");
        assert_eq!(parsed.devices[0].role, DeviceRole::Leader);
        assert_eq!(parsed.edges.len(), 1);
        assert_eq!(parsed.edges[0].to, "AA:0A");
    }

    #[test]
    fn html_unparseable_arrays_are_skipped() {
        let html = r#"
            var nodes = [buildNode(1), buildNode(2)];
            var nodes = [{"mac": "AA:01"}];
        "#;
        let parsed = parse_topology(html, "dump.html").unwrap();
        assert_eq!(parsed.devices.len(), 1);
    }

    #[test]
    fn html_vis_dataset_additions_are_sorted_by_shape() {
        let html = r#"
            <script>
            var network = new vis.Network(container, data, {});
            data.edges.add([{from: 'AA:01', to: 'AA:02'}]);
            data.nodes.add([
                {mac: 'AA:01', role: 'Leader'},
                {mac: 'AA:02', role: 'Router'},
            ]);
            // Second call lands under the other name but holds devices.
            data.edges.add([{label: 'Sensor', id: 'AA:03'}]);
            data.nodes.add([{shape: 'box'}]);
            </script>
        "#;
        let parsed = parse_topology(html, "vis.html").unwrap();
        let macs: Vec<&str> = parsed.devices.iter().map(|d| d.mac.as_str()).collect();
        assert_eq!(macs, vec!["AA:01", "AA:02", "AA:03"]);
        assert_eq!(parsed.edges.len(), 1);
        assert_eq!(parsed.edges[0].from, "AA:01");
    }

    #[test]
    fn html_objects_are_mined_when_no_arrays_match() {
        let html = r#"
            <style>body { margin: 0 }</style>
            <script>
            graph.push({mac: 'AA:01', type: 'Leader'});
            graph.push({ id: 'node-2', label: 'Router B', mac: 'AA:02', role: 'Router' });
            graph.link({ from: 'AA:01', to: 'AA:02', rssi: -60 });
            function draw(from) { return from; }
            </script>
        "#;
        let parsed = parse_topology(html, "mesh.htm").unwrap();
        assert_eq!(parsed.devices.len(), 2);
        assert_eq!(parsed.devices[1].label.as_deref(), Some("Router B"));
        assert_eq!(parsed.edges.len(), 1);
        assert_eq!(parsed.edges[0].rssi, Some(-60.0));
    }

    #[test]
    fn html_object_mining_skipped_when_arrays_matched() {
        let html = r#"
            var nodes = [{"mac": "AA:01"}];
            extra({mac: 'AA:99'});
        "#;
        let parsed = parse_topology(html, "dump.txt").unwrap();
        assert_eq!(parsed.devices.len(), 1);
    }

    #[test]
    fn html_without_arrays_is_a_parse_error() {
        assert!(parse_topology("<html></html>", "empty.htm").is_err());
    }

    #[test]
    fn balanced_ignores_delimiters_in_strings() {
        assert_eq!(balanced(r#"["a]", ["b"]] tail"#, '[', ']'), Some(r#"["a]", ["b"]]"#));
        assert_eq!(balanced("{a: '}', b: {c: 1}} x", '{', '}'), Some("{a: '}', b: {c: 1}}"));
        assert_eq!(balanced("[1, 2", '[', ']'), None);
    }

    #[test]
    fn read_topology_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.json");
        std::fs::write(&path, r#"{"devices": [{"mac": "aa:01"}]}"#).unwrap();
        assert_eq!(read_topology(&path).unwrap().devices.len(), 1);
        assert!(matches!(
            read_topology(&dir.path().join("absent.json")),
            Err(CoreError::Io(_))
        ));
    }
}
