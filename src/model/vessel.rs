//! Vessel identity: canonical names and the identifiers that enrich them.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Canonical vessel name: the physical ship, with any voyage suffix removed.
///
/// Shipment records store the vessel together with its voyage code
/// (`"MSC LAURA [001E]"`). Grouping is by the ship, so the suffix is
/// stripped once here and never re-parsed downstream.
///
/// Never empty. Equality is exact: case and inner whitespace are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VesselName(String);

impl VesselName {
    /// Resolves a raw shipment vessel field to its canonical name.
    ///
    /// Returns `None` when the input is empty or whitespace.
    pub fn resolve(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(strip_voyage_suffix(trimmed).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Strips a trailing `[VOYAGE]` suffix from an already-trimmed name.
///
/// The suffix starts at the first `[` that has a non-empty name before it
/// and non-empty content up to the closing `]` at the very end.
fn strip_voyage_suffix(trimmed: &str) -> &str {
    let Some(body) = trimmed.strip_suffix(']') else {
        return trimmed;
    };
    for (at, _) in body.match_indices('[') {
        if at == 0 || at + 1 >= body.len() {
            continue;
        }
        let name = body[..at].trim_end();
        if !name.is_empty() {
            return name;
        }
    }
    trimmed
}

impl TryFrom<String> for VesselName {
    type Error = String;

    /// Accepts an already-canonical name, as stored in the position tables.
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("vessel name cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<VesselName> for String {
    fn from(name: VesselName) -> Self {
        name.0
    }
}

impl fmt::Display for VesselName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider lookup keys. Either may be missing; both missing means the
/// vessel cannot be looked up at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifiers {
    pub imo: Option<String>,
    pub mmsi: Option<String>,
}

impl Identifiers {
    /// Builds identifiers, treating blank strings as absent.
    pub fn new(imo: Option<&str>, mmsi: Option<&str>) -> Self {
        Self {
            imo: normalize(imo),
            mmsi: normalize(mmsi),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imo.is_none() && self.mmsi.is_none()
    }

    /// Fills gaps in `self` from `other`. Values already present win.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Self {
            imo: self.imo.clone().or_else(|| other.imo.clone()),
            mmsi: self.mmsi.clone().or_else(|| other.mmsi.clone()),
        }
    }

    /// The key the provider is queried with. MMSI is preferred.
    pub fn lookup_key(&self) -> Option<&str> {
        self.mmsi.as_deref().or(self.imo.as_deref())
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// A vessel as the sync core sees it: canonical name plus whatever
/// identifiers are known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselIdentity {
    pub name: VesselName,
    #[serde(flatten)]
    pub identifiers: Identifiers,
}

impl VesselIdentity {
    pub fn new(name: VesselName, identifiers: Identifiers) -> Self {
        Self { name, identifiers }
    }
}

/// A vessel that at least one live shipment refers to.
///
/// Computed fresh for every run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveVesselRef {
    pub identity: VesselIdentity,

    /// The most future ETA among the vessel's shipments, if any had one.
    pub latest_eta: Option<Timestamp>,
}
