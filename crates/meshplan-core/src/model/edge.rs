// ── Edge domain type ──

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::identity::{LoopId, MacAddress};

/// A link between two devices.
///
/// Endpoints are references as the vendor wrote them: a MAC, or a
/// vendor-local id that resolves to a device's MAC. Exports disagree on
/// naming, so both `from`/`to` and `sourceId`/`targetId` are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(alias = "sourceId", alias = "source", deserialize_with = "endpoint")]
    pub from: String,
    #[serde(alias = "targetId", alias = "target", deserialize_with = "endpoint")]
    pub to: String,
    /// Owning loop. Legacy records may lack it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_id: Option<LoopId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_quality: Option<f64>,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            loop_id: None,
            rssi: None,
            link_quality: None,
        }
    }

    pub fn in_loop(mut self, loop_id: LoopId) -> Self {
        self.loop_id = Some(loop_id);
        self
    }

    /// Whether either endpoint names `mac`.
    pub fn touches(&self, mac: &MacAddress) -> bool {
        mac.matches(&self.from) || mac.matches(&self.to)
    }

    /// Signal quality for display: RSSI when known, else link quality.
    pub fn quality(&self) -> Option<f64> {
        self.rssi.or(self.link_quality)
    }
}

fn endpoint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    lenient_id(deserializer)?.ok_or_else(|| serde::de::Error::custom("edge endpoint is empty"))
}

/// Accept a string or a number as an identifier.
pub(crate) fn lenient_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_from_to_with_numeric_ids() {
        let edge: Edge = serde_json::from_value(json!({ "from": 1, "to": "2", "rssi": -70 })).unwrap();
        assert_eq!(edge.from, "1");
        assert_eq!(edge.to, "2");
        assert_eq!(edge.quality(), Some(-70.0));
        assert!(edge.loop_id.is_none());
    }

    #[test]
    fn deserializes_source_target_aliases() {
        let edge: Edge = serde_json::from_value(json!({
            "sourceId": "aa:01",
            "targetId": "aa:02",
            "linkQuality": 0.8
        }))
        .unwrap();
        assert_eq!(edge.from, "aa:01");
        assert_eq!(edge.quality(), Some(0.8));
    }

    #[test]
    fn rejects_missing_endpoint() {
        assert!(serde_json::from_value::<Edge>(json!({ "from": "aa:01" })).is_err());
        assert!(serde_json::from_value::<Edge>(json!({ "from": "aa:01", "to": null })).is_err());
    }

    #[test]
    fn touches_is_case_insensitive() {
        let edge = Edge::new("AA:01", "aa:02");
        assert!(edge.touches(&MacAddress::new("aa:01")));
        assert!(edge.touches(&MacAddress::new("AA-02")));
        assert!(!edge.touches(&MacAddress::new("aa:03")));
    }
}
