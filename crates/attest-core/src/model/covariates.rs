//! Covariate profiles: ordered context attached to a measured baseline.
//!
//! Insertion order is part of a profile's identity: two profiles with the
//! same entries in a different order are different profiles and hash
//! differently.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single covariate observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CovariateValue {
    String { value: String },
    TimeWindow {
        start: String,
        end: String,
        timezone: String,
    },
}

impl CovariateValue {
    fn canonical(&self) -> String {
        match self {
            Self::String { value } => format!("str:{value}"),
            Self::TimeWindow {
                start,
                end,
                timezone,
            } => format!("window:{start}..{end}@{timezone}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CovariateEntry {
    key: String,
    value: CovariateValue,
}

/// Ordered key → value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CovariateProfile {
    entries: Vec<CovariateEntry>,
}

impl CovariateProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`. An existing key keeps its original position; its value is
    /// replaced in place.
    pub fn set(&mut self, key: impl Into<String>, value: CovariateValue) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.value = value;
        } else {
            self.entries.push(CovariateEntry { key, value });
        }
    }

    pub fn get(&self, key: &str) -> Option<&CovariateValue> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CovariateValue)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.value))
    }

    /// 8-hex-digit digest over the canonicalised ordered entries. The empty
    /// profile hashes to the empty string.
    pub fn compute_hash(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}={}", e.key, e.value.canonical()))
            .collect();
        let mut h = Sha256::new();
        h.update(lines.join("\n").as_bytes());
        hex::encode(h.finalize())[..8].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> CovariateValue {
        CovariateValue::String { value: v.into() }
    }

    #[test]
    fn empty_profile_hashes_to_empty_string() {
        assert_eq!(CovariateProfile::new().compute_hash(), "");
    }

    #[test]
    fn hash_is_eight_hex_digits() {
        let mut p = CovariateProfile::new();
        p.set("region", s("eu-west-1"));
        let hash = p.compute_hash();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn insertion_order_is_identity() {
        let mut a = CovariateProfile::new();
        a.set("region", s("eu"));
        a.set("model", s("m-large"));

        let mut b = CovariateProfile::new();
        b.set("model", s("m-large"));
        b.set("region", s("eu"));

        assert_ne!(a, b);
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn replacing_a_key_keeps_its_position() {
        let mut p = CovariateProfile::new();
        p.set("region", s("eu"));
        p.set("model", s("m-large"));
        p.set("region", s("us"));

        let keys: Vec<&str> = p.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["region", "model"]);
        assert_eq!(p.get("region"), Some(&s("us")));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn time_window_and_string_values_hash_differently() {
        let mut a = CovariateProfile::new();
        a.set("window", s("2026-01-01..2026-01-31@UTC"));

        let mut b = CovariateProfile::new();
        b.set(
            "window",
            CovariateValue::TimeWindow {
                start: "2026-01-01".into(),
                end: "2026-01-31".into(),
                timezone: "UTC".into(),
            },
        );
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn profile_round_trips_through_serde() {
        let mut p = CovariateProfile::new();
        p.set("region", s("eu"));
        p.set(
            "window",
            CovariateValue::TimeWindow {
                start: "2026-01-01T00:00:00Z".into(),
                end: "2026-01-31T00:00:00Z".into(),
                timezone: "UTC".into(),
            },
        );
        let yaml = serde_yaml::to_string(&p).unwrap();
        let back: CovariateProfile = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(p, back);
        assert_eq!(p.compute_hash(), back.compute_hash());
    }
}
