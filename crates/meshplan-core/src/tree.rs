// ── Topology tree builder ──
//
// Turns one loop's flat device/edge lists into the display hierarchy:
// LEADERs are roots, every ROUTER is hoisted to sit beside them, CHILD
// devices nest under the backbone node they hang off, and anything no
// LEADER can reach is an orphan.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Device, DeviceRole, Edge, MacAddress};

/// One node of the display tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyTreeNode {
    /// The device MAC, whatever id the edges used to reach it.
    pub id: String,
    pub mac: MacAddress,
    pub role: DeviceRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Depth in the traversal that reached the node; `None` for orphans.
    pub level: Option<u32>,
    pub children: Vec<TopologyTreeNode>,
    /// Quality of the link to the parent (RSSI, else link quality).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uplink_rssi: Option<f64>,
    /// Set by [`filter_topology_nodes`] when a descendant matched.
    pub force_expand: bool,
}

impl TopologyTreeNode {
    fn leaf(device: &Device, level: Option<u32>) -> Self {
        Self {
            id: device.mac.to_string(),
            mac: device.mac.clone(),
            role: device.role,
            label: device.label.clone(),
            level,
            children: Vec::new(),
            uplink_rssi: None,
            force_expand: false,
        }
    }

    fn matches(&self, query: &str, descriptions: &HashMap<MacAddress, String>) -> bool {
        let role: &'static str = self.role.into();
        self.mac.as_str().to_lowercase().contains(query)
            || role.to_lowercase().contains(query)
            || self
                .label
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(query))
            || descriptions
                .get(&self.mac)
                .is_some_and(|d| d.to_lowercase().contains(query))
    }
}

/// Display hierarchy of one loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeResult {
    pub roots: Vec<TopologyTreeNode>,
    pub orphans: Vec<TopologyTreeNode>,
}

impl TreeResult {
    /// LEADERs first, then by MAC.
    pub fn sort_roots(&mut self) {
        self.roots.sort_by(|a, b| {
            (a.role != DeviceRole::Leader)
                .cmp(&(b.role != DeviceRole::Leader))
                .then_with(|| a.mac.cmp(&b.mac))
        });
    }

    /// Count of every node in the result, orphans included.
    pub fn len(&self) -> usize {
        fn count(nodes: &[TopologyTreeNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots) + count(&self.orphans)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.orphans.is_empty()
    }
}

/// Build the display tree for `devices` connected by `edges`.
///
/// Edge endpoints may name a device by MAC or by vendor id. Edges with an
/// unresolvable endpoint are ignored. The graph may contain cycles.
pub fn build_topology_tree(devices: &[Device], edges: &[Edge]) -> TreeResult {
    let mut builder = TreeBuilder::new(devices, edges);

    let mut logical_roots = Vec::new();
    for (idx, device) in devices.iter().enumerate() {
        if device.role == DeviceRole::Leader && !builder.visited[idx] {
            logical_roots.push(builder.visit(idx, 0));
        }
    }

    let orphans = devices
        .iter()
        .enumerate()
        .filter(|(idx, _)| !builder.visited[*idx])
        .map(|(_, d)| TopologyTreeNode::leaf(d, None))
        .collect();

    let mut roots = Vec::new();
    for root in logical_roots {
        hoist_backbone(root, &mut roots);
    }

    TreeResult { roots, orphans }
}

struct TreeBuilder<'a> {
    devices: &'a [Device],
    /// Neighbors per device, ascending by MAC.
    adjacency: Vec<Vec<usize>>,
    links: HashMap<(usize, usize), &'a Edge>,
    visited: Vec<bool>,
}

impl<'a> TreeBuilder<'a> {
    fn new(devices: &'a [Device], edges: &'a [Edge]) -> Self {
        let mut by_mac: HashMap<&MacAddress, usize> = HashMap::new();
        let mut by_raw: HashMap<&str, usize> = HashMap::new();
        for (idx, device) in devices.iter().enumerate() {
            by_mac.insert(&device.mac, idx);
            if let Some(raw) = device.raw_id.as_deref() {
                by_raw.insert(raw, idx);
            }
        }
        let resolve = |reference: &str| {
            by_mac
                .get(&MacAddress::new(reference))
                .or_else(|| by_raw.get(reference.trim()))
                .copied()
        };

        let mut adjacency = vec![Vec::new(); devices.len()];
        let mut links = HashMap::new();
        for edge in edges {
            let (Some(u), Some(v)) = (resolve(edge.from.as_str()), resolve(edge.to.as_str())) else {
                continue;
            };
            links.insert((u, v), edge);
            links.insert((v, u), edge);
            if u != v {
                adjacency[u].push(v);
                adjacency[v].push(u);
            }
        }
        for neighbors in &mut adjacency {
            neighbors.sort_by(|a, b| devices[*a].mac.cmp(&devices[*b].mac).then(a.cmp(b)));
            neighbors.dedup();
        }

        Self {
            devices,
            adjacency,
            links,
            visited: vec![false; devices.len()],
        }
    }

    /// Depth-first from `idx`. Never enters a LEADER and never expands a
    /// CHILD; the visited set breaks cycles.
    fn visit(&mut self, idx: usize, level: u32) -> TopologyTreeNode {
        self.visited[idx] = true;
        let devices = self.devices;
        let device = &devices[idx];
        let mut node = TopologyTreeNode::leaf(device, Some(level));
        if device.role == DeviceRole::Child {
            return node;
        }

        let neighbors = self.adjacency[idx].clone();
        for next in neighbors {
            if self.visited[next] || devices[next].role == DeviceRole::Leader {
                continue;
            }
            let mut child = self.visit(next, level + 1);
            child.uplink_rssi = self.links.get(&(idx, next)).and_then(|e| e.quality());
            node.children.push(child);
        }
        node
    }
}

/// Flatten a logical tree: every backbone node becomes a root (pre-order),
/// keeping only its CHILD devices as children.
fn hoist_backbone(mut node: TopologyTreeNode, roots: &mut Vec<TopologyTreeNode>) {
    let children = std::mem::take(&mut node.children);
    let slot = roots.len();
    roots.push(node);
    for child in children {
        if child.role.is_backbone() {
            hoist_backbone(child, roots);
        } else {
            roots[slot].children.push(child);
        }
    }
}

/// Keep nodes matching `query` (MAC, role, label or alias; case-insensitive)
/// or having a matching descendant. Nodes kept for a descendant's sake are
/// flagged `force_expand`.
pub fn filter_topology_nodes(
    nodes: &[TopologyTreeNode],
    query: &str,
    descriptions: &HashMap<MacAddress, String>,
) -> Vec<TopologyTreeNode> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return nodes.to_vec();
    }
    filter_with(nodes, &query, descriptions)
}

fn filter_with(
    nodes: &[TopologyTreeNode],
    query: &str,
    descriptions: &HashMap<MacAddress, String>,
) -> Vec<TopologyTreeNode> {
    nodes
        .iter()
        .filter_map(|node| {
            let children = filter_with(&node.children, query, descriptions);
            if children.is_empty() && !node.matches(query, descriptions) {
                return None;
            }
            Some(TopologyTreeNode {
                force_expand: !children.is_empty(),
                children,
                ..node.clone()
            })
        })
        .collect()
}
