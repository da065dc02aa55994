//! Persisted position shapes: the per-vessel state row and history entries.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::{Coordinates, VesselDetails};
use super::vessel::{Identifiers, VesselName};

/// The current view of one vessel. One row per canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselPositionState {
    pub name: VesselName,
    #[serde(flatten)]
    pub identifiers: Identifiers,
    pub coordinates: Option<Coordinates>,

    /// Provider-claimed time of the last fix.
    pub last_position_at: Option<Timestamp>,

    /// Time of the last successful provider call. Drives freshness.
    pub last_api_call_at: Option<Timestamp>,

    pub raw_payload: Option<Value>,
    pub details: VesselDetails,
}

impl VesselPositionState {
    /// A row with nothing but a name and identifiers: no fix, never fetched.
    pub fn bare(name: VesselName, identifiers: Identifiers) -> Self {
        Self {
            name,
            identifiers,
            coordinates: None,
            last_position_at: None,
            last_api_call_at: None,
            raw_payload: None,
            details: VesselDetails::default(),
        }
    }
}

/// Where a history entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    /// Policy-driven refresh during a sync run.
    Ais,
    /// Operator-forced refresh that bypassed the freshness window.
    Forced,
    /// Operator-injected payload.
    Manual,
}

impl PositionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ais => "ais",
            Self::Forced => "forced",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ais" => Some(Self::Ais),
            "forced" => Some(Self::Forced),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// One recorded fix. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub name: VesselName,
    #[serde(flatten)]
    pub identifiers: Identifiers,
    pub coordinates: Coordinates,
    pub position_at: Timestamp,
    pub source: PositionSource,
    pub details: VesselDetails,
}

/// A point on a drawn track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub position_at: Option<Timestamp>,
}

impl TrackPoint {
    pub fn new(coordinates: Coordinates, position_at: Option<Timestamp>) -> Self {
        Self {
            lat: coordinates.lat,
            lon: coordinates.lon,
            position_at,
        }
    }
}
