//! Position snapshots: one normalized fix from the tracking provider.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::vessel::Identifiers;

/// A latitude/longitude pair. Both are always present together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Returns `None` for non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }
}

/// Enrichment attributes reported alongside a fix.
///
/// Every field is optional; providers fill whatever they have. Stored as a
/// unit on both the state row and each history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VesselDetails {
    pub name: Option<String>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub destination: Option<String>,
    pub navigational_status: Option<String>,
    pub ship_type: Option<String>,
    pub type_specific: Option<String>,
    pub country: Option<String>,
    pub country_iso: Option<String>,
    pub eta_utc: Option<String>,
    pub atd_utc: Option<String>,
    pub predicted_eta: Option<String>,
    pub last_port: Option<String>,
    pub unlocode_last_port: Option<String>,
    pub unlocode_destination: Option<String>,
    pub distance: Option<String>,
    pub time_remaining: Option<String>,
    pub update_time: Option<String>,
    pub data_source: Option<String>,
    pub eni: Option<String>,
    pub callsign: Option<String>,
    pub current_draught: Option<String>,
    pub length: Option<String>,
    pub beam: Option<String>,
    pub gross_tonnage: Option<String>,
    pub deadweight: Option<String>,
    pub year_built: Option<String>,
    pub hull: Option<String>,
    pub builder: Option<String>,
    pub material: Option<String>,
    pub place_of_build: Option<String>,
    pub teu: Option<String>,
    pub ballast_water: Option<String>,
    pub crude_oil: Option<String>,
    pub fresh_water: Option<String>,
    pub gas: Option<String>,
    pub grain: Option<String>,
    pub bale: Option<String>,
    pub engine: Option<Value>,
    pub ports: Option<Value>,
    pub management: Option<Value>,
    pub image_url: Option<String>,
}

/// A validated fix. Only the provider boundary builds these, so the rest of
/// the crate never sees a half-formed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub coordinates: Coordinates,

    /// When the provider says the ship was there. Not when we asked.
    pub position_at: Timestamp,

    /// Identifiers echoed back by the provider, if any.
    pub identifiers: Identifiers,

    pub details: VesselDetails,

    /// The provider response as received.
    pub raw_payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_reject_out_of_range() {
        assert!(Coordinates::new(-33.03, -71.63).is_some());
        assert!(Coordinates::new(91.0, 0.0).is_none());
        assert!(Coordinates::new(0.0, -180.5).is_none());
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn details_deserialize_from_partial_json() {
        let details: VesselDetails =
            serde_json::from_str(r#"{"speed": 12.5, "destination": "CLVAP"}"#).unwrap();
        assert_eq!(details.speed, Some(12.5));
        assert_eq!(details.destination.as_deref(), Some("CLVAP"));
        assert!(details.course.is_none());
    }
}
