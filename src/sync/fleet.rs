//! Fleet-wide reads and seeding over the active set.

use jiff::Timestamp;
use serde::Serialize;
use tracing::{info, warn};

use crate::model::{
    Coordinates, HistoryEntry, Identifiers, TrackPoint, VesselDetails, VesselName,
    VesselPositionState,
};
use crate::provider::AisProvider;
use crate::selector::ShipmentSource;
use crate::storage::PositionStore;

use super::{SyncError, Synchronizer};

/// One active vessel as drawn on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveVessel {
    pub name: VesselName,
    #[serde(flatten)]
    pub identifiers: Identifiers,
    pub latest_eta: Option<Timestamp>,
    pub coordinates: Option<Coordinates>,
    pub last_position_at: Option<Timestamp>,
    pub last_api_call_at: Option<Timestamp>,
    pub details: Option<VesselDetails>,
    pub track: Vec<TrackPoint>,
}

impl<S, P> Synchronizer<'_, S, P>
where
    S: PositionStore + ShipmentSource,
    P: AisProvider,
{
    /// Every active vessel with its last known position and track.
    pub fn active_view(&self, now: Timestamp) -> Result<Vec<ActiveVessel>, SyncError> {
        let active = self.active(now)?;
        let names: Vec<VesselName> = active.iter().map(|v| v.identity.name.clone()).collect();
        let mut states = self.store.load_states(&names)?;

        let mut view = Vec::with_capacity(active.len());
        for vessel in active {
            let name = vessel.identity.name;
            let history = self.store.load_track(&name)?;
            let state = match states.remove(&name).transpose() {
                Ok(state) => state,
                Err(e) => {
                    warn!(vessel = %name, error = %e, "unreadable position row, showing none");
                    None
                }
            };
            let track = build_track(&history, state.as_ref());

            let identifiers = match &state {
                Some(s) => s.identifiers.or(&vessel.identity.identifiers),
                None => vessel.identity.identifiers,
            };
            view.push(ActiveVessel {
                name,
                identifiers,
                latest_eta: vessel.latest_eta,
                coordinates: state.as_ref().and_then(|s| s.coordinates),
                last_position_at: state.as_ref().and_then(|s| s.last_position_at),
                last_api_call_at: state.as_ref().and_then(|s| s.last_api_call_at),
                details: state.map(|s| s.details),
                track,
            });
        }
        Ok(view)
    }

    /// Creates bare rows for active vessels that have none.
    ///
    /// Bare rows carry no call time, so they are never fresh.
    pub fn seed(&self, now: Timestamp) -> Result<Vec<VesselName>, SyncError> {
        let names: Vec<VesselName> = self
            .active(now)?
            .into_iter()
            .map(|v| v.identity.name)
            .collect();
        let created = self.store.seed_missing(&names, now)?;
        info!(active = names.len(), created = created.len(), "seeded vessel rows");
        Ok(created)
    }
}

/// History points in time order, plus the state's position when it is newer
/// than the last recorded point or its time is unknown.
fn build_track(history: &[HistoryEntry], state: Option<&VesselPositionState>) -> Vec<TrackPoint> {
    let mut track: Vec<TrackPoint> = history
        .iter()
        .map(|e| TrackPoint::new(e.coordinates, Some(e.position_at)))
        .collect();

    let Some(state) = state else {
        return track;
    };
    let Some(coordinates) = state.coordinates else {
        return track;
    };

    let newer = match (history.last(), state.last_position_at) {
        (Some(last), Some(at)) => at > last.position_at,
        _ => true,
    };
    if newer {
        track.push(TrackPoint::new(coordinates, state.last_position_at));
    }
    track
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::PositionSource;
    use crate::policy::FreshnessPolicy;
    use crate::storage::Storage;
    use crate::sync::tests::{
        FakeProvider, add_shipment, fix, hours_ago, known_vessel, name, now,
    };

    fn entry(lat: f64, at: &str) -> HistoryEntry {
        let snapshot = fix(lat, at);
        HistoryEntry {
            name: name("MSC LAURA"),
            identifiers: Identifiers::default(),
            coordinates: snapshot.coordinates,
            position_at: snapshot.position_at,
            source: PositionSource::Ais,
            details: VesselDetails::default(),
        }
    }

    fn state_at(lat: f64, at: Option<&str>) -> VesselPositionState {
        let mut state = VesselPositionState::bare(name("MSC LAURA"), Identifiers::default());
        state.coordinates = Coordinates::new(lat, -71.6);
        state.last_position_at = at.map(|a| a.parse().unwrap());
        state
    }

    #[test]
    fn track_appends_newer_state_position() {
        let history = [entry(-30.0, "2025-03-01T00:00:00Z")];
        let state = state_at(-31.0, Some("2025-03-01T06:00:00Z"));

        let track = build_track(&history, Some(&state));
        assert_eq!(track.len(), 2);
        assert!((track[1].lat - -31.0).abs() < f64::EPSILON);
    }

    #[test]
    fn track_skips_state_already_in_history() {
        let history = [entry(-30.0, "2025-03-01T00:00:00Z")];
        let state = state_at(-30.0, Some("2025-03-01T00:00:00Z"));

        assert_eq!(build_track(&history, Some(&state)).len(), 1);
    }

    #[test]
    fn track_appends_state_with_unknown_time() {
        let history = [entry(-30.0, "2025-03-01T00:00:00Z")];
        let state = state_at(-31.0, None);

        let track = build_track(&history, Some(&state));
        assert_eq!(track.len(), 2);
        assert_eq!(track[1].position_at, None);
    }

    #[test]
    fn track_without_history_is_the_state_position() {
        let state = state_at(-31.0, Some("2025-03-01T06:00:00Z"));
        assert_eq!(build_track(&[], Some(&state)).len(), 1);

        let bare = VesselPositionState::bare(name("MSC LAURA"), Identifiers::default());
        assert!(build_track(&[], Some(&bare)).is_empty());
        assert!(build_track(&[], None).is_empty());
    }

    #[test]
    fn active_view_lists_active_vessels_with_tracks() {
        let storage = Storage::open_in_memory().unwrap();
        add_shipment(&storage, "MSC LAURA [001E]");
        add_shipment(&storage, "EVER ACE [12W]");
        known_vessel(&storage, "MSC LAURA", "9839131", hours_ago(30));
        let provider = FakeProvider::default().with_fix("9839131", fix(-33.0, "2025-03-01T07:45:00Z"));
        let sync = Synchronizer::new(&storage, &provider, FreshnessPolicy::default());
        sync.run(now()).unwrap();

        let view = sync.active_view(now()).unwrap();

        assert_eq!(view.len(), 2);
        assert_eq!(view[0].name, name("MSC LAURA"));
        assert_eq!(view[0].identifiers.imo.as_deref(), Some("9839131"));
        assert_eq!(view[0].last_api_call_at, Some(now()));
        assert_eq!(view[0].track.len(), 1);
        assert_eq!(view[1].name, name("EVER ACE"));
        assert!(view[1].coordinates.is_none());
        assert!(view[1].track.is_empty());
    }

    #[test]
    fn seed_creates_rows_that_are_not_fresh() {
        let storage = Storage::open_in_memory().unwrap();
        add_shipment(&storage, "MSC LAURA [001E]");
        add_shipment(&storage, "EVER ACE [12W]");
        known_vessel(&storage, "MSC LAURA", "9839131", hours_ago(2));
        let provider = FakeProvider::default();
        let sync = Synchronizer::new(&storage, &provider, FreshnessPolicy::default());

        let created = sync.seed(now()).unwrap();
        assert_eq!(created, vec![name("EVER ACE")]);
        assert!(sync.seed(now()).unwrap().is_empty());

        let result = sync.run(now()).unwrap();
        assert_eq!(result.skipped, vec![name("MSC LAURA")]);
        assert_eq!(result.missing_identifiers, vec![name("EVER ACE")]);
    }
}
