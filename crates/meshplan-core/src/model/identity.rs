// ── Core identity types ──
//
// MacAddress and LoopId form the foundation of every topology type.
// MAC identity is case-insensitive everywhere in the core; the spelling a
// vendor export used is preserved for display.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── MacAddress ──────────────────────────────────────────────────────

/// Device identifier as supplied by the vendor export.
///
/// Equality, hashing and ordering use the canonical form (lowercase, `-`
/// read as `:`), so `AA-BB-CC` and `aa:bb:cc` name the same device. Display
/// and serialization keep the original spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form: lowercase, colon-separated.
    pub fn canonical(&self) -> String {
        self.canonical_chars().collect()
    }

    /// Whether `raw` names this device.
    pub fn matches(&self, raw: &str) -> bool {
        self.canonical_chars()
            .eq(raw.trim().chars().map(canonical_char))
    }

    fn canonical_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().map(canonical_char)
    }
}

fn canonical_char(c: char) -> char {
    if c == '-' { ':' } else { c.to_ascii_lowercase() }
}

impl PartialEq for MacAddress {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_chars().eq(other.canonical_chars())
    }
}

impl Eq for MacAddress {}

impl Hash for MacAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.canonical_chars() {
            c.hash(state);
        }
    }
}

impl PartialOrd for MacAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MacAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_chars().cmp(other.canonical_chars())
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for MacAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ── LoopId ──────────────────────────────────────────────────────────

/// Number of loops a project can hold.
pub const MAX_LOOPS: usize = 24;

/// A numbered logical loop, always within `1..=24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct LoopId(u8);

impl LoopId {
    pub fn new(value: i64) -> Result<Self, CoreError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (1..=24).contains(v))
            .map(Self)
            .ok_or(CoreError::InvalidLoop { value })
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every valid loop id in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=24).map(Self)
    }
}

impl TryFrom<i64> for LoopId {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LoopId> for u8 {
    fn from(id: LoopId) -> Self {
        id.0
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LoopId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s.trim().parse().map_err(|_| CoreError::Parse {
            message: format!("'{s}' is not a loop number"),
        })?;
        Self::new(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn mac_address_compares_case_insensitively() {
        assert_eq!(MacAddress::new("AA:BB:CC"), MacAddress::new("aa:bb:cc"));
    }

    #[test]
    fn mac_address_treats_dashes_as_colons() {
        assert_eq!(MacAddress::new("aa-bb-cc"), MacAddress::new("AA:BB:CC"));
    }

    #[test]
    fn mac_address_hash_follows_equality() {
        let mut set = HashSet::new();
        set.insert(MacAddress::new("AA:BB"));
        assert!(set.contains(&MacAddress::new("aa-bb")));
    }

    #[test]
    fn mac_address_display_keeps_original_spelling() {
        let mac: MacAddress = "AA:BB".parse().unwrap();
        assert_eq!(mac.to_string(), "AA:BB");
        assert_eq!(mac.canonical(), "aa:bb");
    }

    #[test]
    fn mac_address_matches_raw_strings() {
        assert!(MacAddress::new("AA:BB").matches(" aa-bb "));
        assert!(!MacAddress::new("AA:BB").matches("aa:bc"));
    }

    #[test]
    fn loop_id_accepts_valid_range() {
        assert_eq!(LoopId::new(1).unwrap().get(), 1);
        assert_eq!(LoopId::new(24).unwrap().get(), 24);
        assert_eq!(LoopId::all().count(), MAX_LOOPS);
    }

    #[test]
    fn loop_id_rejects_out_of_range() {
        assert!(matches!(LoopId::new(0), Err(CoreError::InvalidLoop { value: 0 })));
        assert!(matches!(LoopId::new(25), Err(CoreError::InvalidLoop { value: 25 })));
        assert!(LoopId::new(-3).is_err());
    }

    #[test]
    fn loop_id_round_trips_through_json_as_integer() {
        let id = LoopId::new(7).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        assert!(serde_json::from_str::<LoopId>("30").is_err());
    }

    #[test]
    fn loop_id_from_str() {
        assert_eq!("12".parse::<LoopId>().unwrap().get(), 12);
        assert!("twelve".parse::<LoopId>().is_err());
    }
}
