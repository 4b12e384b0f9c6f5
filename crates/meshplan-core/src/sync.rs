// ── Best-effort backend sync ──
//
// Mirrors loop imports and deletions to the topology backend. Local state
// is always committed first; a failed sync is logged and never rolls
// anything back.

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::{DeviceRole, LoopId, MacAddress};
use crate::topology::TopologyState;

/// Body of `POST /topology/sync`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPayload {
    pub devices: Vec<SyncDevice>,
    pub edges: Vec<SyncEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDevice {
    pub mac: MacAddress,
    #[serde(rename = "type")]
    pub role: DeviceRole,
    pub loop_id: LoopId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEdge {
    pub source_id: String,
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_quality: Option<f64>,
}

impl SyncPayload {
    /// Every device and edge the committed state holds for `loop_id`.
    pub fn for_loop(state: &TopologyState, loop_id: LoopId) -> Self {
        Self {
            devices: state
                .loop_devices(loop_id)
                .map(|d| SyncDevice {
                    mac: d.mac.clone(),
                    role: d.role,
                    loop_id,
                })
                .collect(),
            edges: state
                .loop_edges(loop_id)
                .map(|e| SyncEdge {
                    source_id: e.from.clone(),
                    target_id: e.to.clone(),
                    rssi: e.rssi,
                    link_quality: e.link_quality,
                })
                .collect(),
        }
    }
}

/// HTTP client for the topology backend.
#[derive(Debug, Clone)]
pub struct TopologySync {
    http: reqwest::Client,
    config: SyncConfig,
}

impl TopologySync {
    pub fn new(config: SyncConfig) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("meshplan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::Sync {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// `POST {base}/topology/sync`.
    pub async fn push(&self, payload: &SyncPayload) -> Result<(), CoreError> {
        let url = self.config.endpoint("topology/sync")?;
        debug!(%url, devices = payload.devices.len(), edges = payload.edges.len(), "pushing topology");
        let resp = self.http.post(url).json(payload).send().await?;
        check_status(resp).await
    }

    /// `DELETE {base}/topology/loop/{id}`.
    pub async fn delete_loop(&self, loop_id: LoopId) -> Result<(), CoreError> {
        let url = self.config.endpoint(&format!("topology/loop/{loop_id}"))?;
        debug!(%url, "deleting loop on backend");
        let resp = self.http.delete(url).send().await?;
        check_status(resp).await
    }

    /// Fire-and-forget [`push`](Self::push). Failures are only logged.
    pub fn push_detached(&self, payload: SyncPayload) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.push(&payload).await {
                warn!(error = %e, "topology sync failed; local state kept");
            }
        })
    }

    /// Fire-and-forget [`delete_loop`](Self::delete_loop). Failures are only logged.
    pub fn delete_loop_detached(&self, loop_id: LoopId) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.delete_loop(loop_id).await {
                warn!(%loop_id, error = %e, "backend loop delete failed; local state kept");
            }
        })
    }
}

async fn check_status(resp: reqwest::Response) -> Result<(), CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    let body = body.trim();
    Err(CoreError::Sync {
        message: if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", truncate(body, 200))
        },
        status: Some(status.as_u16()),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Device, DeviceRecord, Edge};

    #[test]
    fn payload_covers_one_loop_in_backend_shape() {
        let l1 = LoopId::new(1).unwrap();
        let l2 = LoopId::new(2).unwrap();
        let mut edge = Edge::new("aa:01", "aa:02").in_loop(l1);
        edge.rssi = Some(-40.0);
        let state = TopologyState {
            devices: vec![
                Device::discovered(DeviceRecord::new("aa:01", DeviceRole::Leader), l1),
                Device::discovered(DeviceRecord::new("bb:01", DeviceRole::Leader), l2),
            ],
            edges: vec![edge, Edge::new("bb:01", "bb:02").in_loop(l2)],
            active_loop_ids: vec![l1, l2],
        };

        let payload = SyncPayload::for_loop(&state, l1);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "devices": [{"mac": "aa:01", "type": "LEADER", "loopId": 1}],
                "edges": [{"sourceId": "aa:01", "targetId": "aa:02", "rssi": -40.0}]
            })
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
