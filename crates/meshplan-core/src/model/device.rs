// ── Device domain types ──

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::edge::lenient_id;
use super::identity::{LoopId, MacAddress};

/// Canonical device role -- normalized from whatever the vendor export says.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum DeviceRole {
    Leader,
    Router,
    Child,
}

impl DeviceRole {
    /// Classify a vendor role/type string.
    ///
    /// Anything mentioning "leader" is a LEADER, anything mentioning
    /// "router" (or the bare word "node") is a ROUTER, everything else
    /// is a CHILD.
    pub fn classify(raw: &str) -> Self {
        let r = raw.trim().to_lowercase();
        if r.contains("leader") {
            Self::Leader
        } else if r.contains("router") || r == "node" {
            Self::Router
        } else {
            Self::Child
        }
    }

    /// LEADER and ROUTER form the backbone; CHILD devices are leaves.
    pub fn is_backbone(self) -> bool {
        matches!(self, Self::Leader | Self::Router)
    }
}

impl<'de> Deserialize<'de> for DeviceRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::classify(&raw))
    }
}

/// Reconciliation status of a stored device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    /// Known to the loop but absent from the latest import.
    Missing,
}

/// A freshly parsed device, before it is merged into a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub mac: MacAddress,
    /// Vendor-local id (often numeric); edges may reference it instead of the MAC.
    #[serde(
        rename = "id",
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_id: Option<String>,
    #[serde(rename = "type", alias = "role", default = "default_role")]
    pub role: DeviceRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_quality: Option<f64>,
    /// Any other vendor attributes, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_role() -> DeviceRole {
    DeviceRole::Child
}

/// Keys lifted into typed fields; everything else lands in `extra`.
const RECORD_KEYS: &[&str] = &[
    "mac",
    "id",
    "role",
    "type",
    "label",
    "ip",
    "rssi",
    "linkQuality",
    "status",
    "loopId",
    "isNew",
];

impl DeviceRecord {
    pub fn new(mac: impl Into<MacAddress>, role: DeviceRole) -> Self {
        Self {
            mac: mac.into(),
            raw_id: None,
            role,
            label: None,
            ip: None,
            rssi: None,
            link_quality: None,
            extra: Map::new(),
        }
    }

    /// Build a record from a loosely shaped vendor object.
    ///
    /// The MAC falls back to the vendor id when absent; the role falls back
    /// from `role` to `type`. Returns `None` when neither `mac` nor `id`
    /// is present.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut obj) = value else {
            return None;
        };

        let raw_id = obj.get("id").and_then(scalar_string);
        let mac = obj
            .get("mac")
            .and_then(scalar_string)
            .filter(|m| !m.trim().is_empty())
            .or_else(|| raw_id.clone())?;

        let role_str = obj
            .get("role")
            .and_then(Value::as_str)
            .or_else(|| obj.get("type").and_then(Value::as_str))
            .unwrap_or_default();
        let role = DeviceRole::classify(role_str);

        let label = obj.get("label").and_then(scalar_string);
        let ip = obj.get("ip").and_then(scalar_string);
        let rssi = obj.get("rssi").and_then(lenient_f64);
        let link_quality = obj.get("linkQuality").and_then(lenient_f64);

        obj.retain(|k, _| !RECORD_KEYS.contains(&k.as_str()));

        Some(Self {
            mac: MacAddress::new(mac),
            raw_id,
            role,
            label,
            ip,
            rssi,
            link_quality,
            extra: obj,
        })
    }

    pub fn with_raw_id(mut self, raw_id: impl Into<String>) -> Self {
        self.raw_id = Some(raw_id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The canonical Device type, as held by the Topology Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub mac: MacAddress,
    #[serde(
        rename = "id",
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_id: Option<String>,
    #[serde(rename = "type", alias = "role", default = "default_role")]
    pub role: DeviceRole,
    pub loop_id: LoopId,
    #[serde(default)]
    pub status: DeviceStatus,
    /// Set by the reconciliation pass that first saw this device; cleared
    /// by the next one.
    #[serde(default)]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_quality: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// A device first discovered by an import into `loop_id`.
    pub fn discovered(record: DeviceRecord, loop_id: LoopId) -> Self {
        Self {
            mac: record.mac,
            raw_id: record.raw_id,
            role: record.role,
            loop_id,
            status: DeviceStatus::Active,
            is_new: true,
            label: record.label,
            ip: record.ip,
            rssi: record.rssi,
            link_quality: record.link_quality,
            extra: record.extra,
        }
    }

    /// Overwrite every attribute the record supplies; keep the rest.
    ///
    /// The device becomes active and is no longer new. Loop membership
    /// never changes here.
    pub fn absorb(&mut self, record: DeviceRecord) {
        self.mac = record.mac;
        self.role = record.role;
        if record.raw_id.is_some() {
            self.raw_id = record.raw_id;
        }
        if record.label.is_some() {
            self.label = record.label;
        }
        if record.ip.is_some() {
            self.ip = record.ip;
        }
        if record.rssi.is_some() {
            self.rssi = record.rssi;
        }
        if record.link_quality.is_some() {
            self.link_quality = record.link_quality;
        }
        self.extra.extend(record.extra);
        self.status = DeviceStatus::Active;
        self.is_new = false;
    }

    /// Retain as a ghost: last known attributes, `missing` status.
    pub fn mark_missing(&mut self) {
        self.status = DeviceStatus::Missing;
        self.is_new = false;
    }

    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }

    pub fn is_missing(&self) -> bool {
        self.status == DeviceStatus::Missing
    }

    /// Whether an edge endpoint reference (`MAC` or vendor id) names this device.
    pub fn answers_to(&self, reference: &str) -> bool {
        self.mac.matches(reference) || self.raw_id.as_deref() == Some(reference.trim())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn loop_id(n: i64) -> LoopId {
        LoopId::new(n).unwrap()
    }

    #[test]
    fn role_classification() {
        assert_eq!(DeviceRole::classify("Leader"), DeviceRole::Leader);
        assert_eq!(DeviceRole::classify("mesh-router"), DeviceRole::Router);
        assert_eq!(DeviceRole::classify("node"), DeviceRole::Router);
        assert_eq!(DeviceRole::classify("end device"), DeviceRole::Child);
        assert_eq!(DeviceRole::classify(""), DeviceRole::Child);
    }

    #[test]
    fn role_display_is_uppercase() {
        assert_eq!(DeviceRole::Router.to_string(), "ROUTER");
        assert_eq!(DeviceStatus::Missing.to_string(), "missing");
    }

    #[test]
    fn record_from_vendor_object() {
        let record = DeviceRecord::from_value(json!({
            "id": 17,
            "mac": "AA:BB:CC:00:00:01",
            "role": "leader",
            "label": "Gateway",
            "rssi": "-48",
            "firmware": "2.1.0"
        }))
        .unwrap();

        assert_eq!(record.mac, MacAddress::new("aa:bb:cc:00:00:01"));
        assert_eq!(record.raw_id.as_deref(), Some("17"));
        assert_eq!(record.role, DeviceRole::Leader);
        assert_eq!(record.label.as_deref(), Some("Gateway"));
        assert_eq!(record.rssi, Some(-48.0));
        assert_eq!(record.extra.get("firmware"), Some(&json!("2.1.0")));
        assert!(!record.extra.contains_key("role"));
    }

    #[test]
    fn record_falls_back_to_id_and_type() {
        let record = DeviceRecord::from_value(json!({ "id": "n-4", "type": "Router" })).unwrap();
        assert_eq!(record.mac.as_str(), "n-4");
        assert_eq!(record.role, DeviceRole::Router);
    }

    #[test]
    fn record_without_identity_is_rejected() {
        assert!(DeviceRecord::from_value(json!({ "label": "x" })).is_none());
        assert!(DeviceRecord::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn absorb_overwrites_supplied_attributes_only() {
        let mut device = Device::discovered(
            DeviceRecord::new("aa:01", DeviceRole::Child).with_label("Old"),
            loop_id(3),
        );
        device.ip = Some("10.0.0.2".into());
        device.mark_missing();

        let mut update = DeviceRecord::new("AA:01", DeviceRole::Router);
        update.rssi = Some(-60.0);
        device.absorb(update);

        assert_eq!(device.role, DeviceRole::Router);
        assert_eq!(device.label.as_deref(), Some("Old"));
        assert_eq!(device.ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(device.rssi, Some(-60.0));
        assert_eq!(device.status, DeviceStatus::Active);
        assert!(!device.is_new);
        assert_eq!(device.loop_id, loop_id(3));
    }

    #[test]
    fn device_json_uses_camel_case_and_keeps_extras() {
        let mut record = DeviceRecord::new("aa:02", DeviceRole::Leader).with_raw_id("9");
        record.extra.insert("parent".into(), json!("aa:01"));
        let device = Device::discovered(record, loop_id(5));

        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["loopId"], json!(5));
        assert_eq!(value["isNew"], json!(true));
        assert_eq!(value["type"], json!("LEADER"));
        assert_eq!(value["id"], json!("9"));
        assert_eq!(value["parent"], json!("aa:01"));

        let back: Device = serde_json::from_value(value).unwrap();
        assert_eq!(back, device);
    }

    #[test]
    fn answers_to_mac_or_raw_id() {
        let device = Device::discovered(
            DeviceRecord::new("AA:03", DeviceRole::Child).with_raw_id("42"),
            loop_id(1),
        );
        assert!(device.answers_to("aa-03"));
        assert!(device.answers_to("42"));
        assert!(!device.answers_to("43"));
    }
}
