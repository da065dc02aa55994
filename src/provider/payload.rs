//! Normalizes provider-shaped JSON into a [`PositionSnapshot`].
//!
//! Shared by the HTTP client and the manual injection path. Accepts the
//! response either bare or wrapped in `detail`, tolerates numbers sent as
//! strings, and turns empty strings into absent values.

use jiff::Timestamp;
use serde_json::{Map, Value};

use crate::model::{Coordinates, Identifiers, PositionSnapshot, VesselDetails, parse_instant};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no usable coordinates")]
    MissingCoordinates,

    #[error("coordinates out of range: lat {lat}, lon {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

/// Parses a provider payload. Falls back to `now` when the payload carries no
/// parseable position time.
pub fn parse_snapshot(payload: &Value, now: Timestamp) -> Result<PositionSnapshot, PayloadError> {
    let root = payload.as_object().ok_or(PayloadError::NotAnObject)?;
    let detail = match root.get("detail") {
        Some(Value::Object(inner)) => inner,
        _ => root,
    };

    let lat = number(detail, &["latitude", "Latitud", "lat", "Lat"]);
    let lon = number(detail, &["longitude", "Longitud", "lon", "Lon"]);
    let (Some(lat), Some(lon)) = (lat, lon) else {
        return Err(PayloadError::MissingCoordinates);
    };
    let coordinates =
        Coordinates::new(lat, lon).ok_or(PayloadError::InvalidCoordinates { lat, lon })?;

    let position_at = text(detail, &["positionReceived", "Posición recibida", "updateTime"])
        .and_then(|raw| parse_instant(&raw))
        .unwrap_or(now);

    let identifiers = Identifiers::new(
        text(detail, &["imo"]).as_deref(),
        text(detail, &["mmsi"]).as_deref(),
    );

    Ok(PositionSnapshot {
        coordinates,
        position_at,
        identifiers,
        details: details(detail),
        raw_payload: payload.clone(),
    })
}

fn details(d: &Map<String, Value>) -> VesselDetails {
    VesselDetails {
        name: text(d, &["name"]),
        speed: number(d, &["speed", "Velocidad"]),
        course: number(d, &["course", "Rumbo"]),
        destination: text(d, &["destination", "Destino"]),
        navigational_status: text(d, &["navigationalStatus"]),
        ship_type: text(d, &["shipType"]),
        type_specific: text(d, &["typeSpecific"]),
        country: text(d, &["country"]),
        country_iso: text(d, &["countryIso"]),
        eta_utc: text(d, &["etaUtc"]),
        atd_utc: text(d, &["atdUtc"]),
        predicted_eta: text(d, &["predictedEta"]),
        last_port: text(d, &["lastPort"]),
        unlocode_last_port: text(d, &["unlocode_lastport"]),
        unlocode_destination: text(d, &["unlocode_destination"]),
        distance: text(d, &["distance"]),
        time_remaining: text(d, &["time", "timeRemaining"]),
        update_time: text(d, &["updateTime"]),
        data_source: text(d, &["dataSource"]),
        eni: text(d, &["eni"]),
        callsign: text(d, &["callsign"]),
        current_draught: text(d, &["currentDraught", "draught"]),
        length: text(d, &["length"]),
        beam: text(d, &["beam"]),
        gross_tonnage: text(d, &["grossTonnage"]),
        deadweight: text(d, &["deadweight"]),
        year_built: text(d, &["yearOfBuilt"]),
        hull: text(d, &["hull"]),
        builder: text(d, &["builder"]),
        material: text(d, &["material"]),
        place_of_build: text(d, &["placeOfBuild"]),
        teu: text(d, &["teu"]),
        ballast_water: text(d, &["ballastWater"]),
        crude_oil: text(d, &["crudeOil"]),
        fresh_water: text(d, &["freshWater"]),
        gas: text(d, &["gas"]),
        grain: text(d, &["grain"]),
        bale: text(d, &["bale"]),
        engine: blob(d, "engine"),
        ports: blob(d, "ports"),
        management: blob(d, "management"),
        image_url: text(d, &["image", "Image"]),
    }
}

/// First present key wins.
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

/// A number, or a string holding one. Non-finite values are dropped.
fn number(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let value = match lookup(map, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

/// A trimmed, non-empty string. Numbers and booleans are stringified.
fn text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let raw = match lookup(map, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

fn blob(map: &Map<String, Value>, key: &str) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn now() -> Timestamp {
        "2025-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn parses_wrapped_detail() {
        let payload = json!({
            "detail": {
                "name": "MSC LAURA",
                "imo": "9839131",
                "mmsi": 636019825,
                "latitude": "-33.0245",
                "longitude": "-71.6301",
                "positionReceived": "2025-03-01T08:15:00Z",
                "speed": "12.4",
                "course": 187,
                "destination": " CLVAP ",
                "navigationalStatus": "",
                "engine": {"type": "diesel"}
            }
        });

        let snapshot = parse_snapshot(&payload, now()).unwrap();
        assert_eq!(snapshot.coordinates, Coordinates::new(-33.0245, -71.6301).unwrap());
        assert_eq!(snapshot.position_at, "2025-03-01T08:15:00Z".parse::<Timestamp>().unwrap());
        assert_eq!(snapshot.identifiers.imo.as_deref(), Some("9839131"));
        assert_eq!(snapshot.identifiers.mmsi.as_deref(), Some("636019825"));
        assert_eq!(snapshot.details.speed, Some(12.4));
        assert_eq!(snapshot.details.course, Some(187.0));
        assert_eq!(snapshot.details.destination.as_deref(), Some("CLVAP"));
        assert_eq!(snapshot.details.navigational_status, None);
        assert_eq!(snapshot.details.engine, Some(json!({"type": "diesel"})));
        assert_eq!(snapshot.raw_payload, payload);
    }

    #[test]
    fn parses_bare_object_with_short_keys() {
        let payload = json!({"lat": 1.5, "lon": 103.8});
        let snapshot = parse_snapshot(&payload, now()).unwrap();
        assert_eq!(snapshot.coordinates.lat, 1.5);
        assert!(snapshot.identifiers.is_empty());
    }

    #[test]
    fn unparseable_time_falls_back_to_now() {
        let payload = json!({"lat": 1.5, "lon": 103.8, "positionReceived": "yesterday-ish"});
        let snapshot = parse_snapshot(&payload, now()).unwrap();
        assert_eq!(snapshot.position_at, now());
    }

    #[test]
    fn offsetless_times_are_kept_as_utc() {
        let expected: Timestamp = "2025-03-01T08:15:00Z".parse().unwrap();
        for raw in [
            "2025-03-01T08:15:00",
            "2025-03-01 08:15:00",
            "2025-03-01 08:15 UTC",
        ] {
            let payload = json!({"lat": 1.5, "lon": 103.8, "positionReceived": raw});
            let snapshot = parse_snapshot(&payload, now()).unwrap();
            assert_eq!(snapshot.position_at, expected, "{raw}");
        }
    }

    #[test]
    fn accepts_spanish_field_names() {
        let payload = json!({
            "detail": {
                "Latitud": "-33.0",
                "Longitud": "-71.6",
                "Posición recibida": "2025-03-01 08:15 UTC",
                "Velocidad": "11.5",
                "Rumbo": 90,
                "Destino": "CLSAI"
            }
        });

        let snapshot = parse_snapshot(&payload, now()).unwrap();
        assert_eq!(snapshot.coordinates, Coordinates::new(-33.0, -71.6).unwrap());
        assert_eq!(snapshot.position_at, "2025-03-01T08:15:00Z".parse::<Timestamp>().unwrap());
        assert_eq!(snapshot.details.speed, Some(11.5));
        assert_eq!(snapshot.details.course, Some(90.0));
        assert_eq!(snapshot.details.destination.as_deref(), Some("CLSAI"));
    }

    #[test]
    fn rejects_missing_coordinates() {
        let err = parse_snapshot(&json!({"detail": {"lat": 1.0}}), now()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingCoordinates));

        let err = parse_snapshot(&json!({"lat": "", "lon": ""}), now()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingCoordinates));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let err = parse_snapshot(&json!({"lat": 123.0, "lon": 0.0}), now()).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidCoordinates { .. }));
    }

    #[test]
    fn rejects_non_objects() {
        let err = parse_snapshot(&json!([1, 2]), now()).unwrap_err();
        assert!(matches!(err, PayloadError::NotAnObject));
    }
}
