//! Operator diagnostics and repairs for a single vessel.
//!
//! Repairs bypass the freshness policy on purpose. Each one logs a `bypass`
//! field at warn level and tags its history entry, so the audit trail shows
//! which fixes did not come from a scheduled run.

use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::model::{
    ActiveVesselRef, Identifiers, PositionSource, VesselIdentity, VesselName,
    VesselPositionState,
};
use crate::provider::{AisProvider, PayloadError, parse_snapshot};
use crate::selector::ShipmentSource;
use crate::storage::{PositionStore, StorageError};

use super::{SyncError, Synchronizer, record_fix};

/// Why a vessel does or does not show up on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub name: VesselName,
    pub in_active_set: bool,
    pub has_state: bool,
    pub has_coordinates: bool,
    pub has_identifiers: bool,
    pub is_fresh: bool,
    pub should_appear_on_map: bool,
    pub latest_eta: Option<Timestamp>,
    pub state: Option<VesselPositionState>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error("{0} has no IMO or MMSI; set one with `set-ids` first")]
    NoIdentifiers(VesselName),

    #[error("provider returned no position for {0}")]
    NoProviderData(VesselName),

    #[error("invalid payload: {0}")]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl<S, P> Synchronizer<'_, S, P>
where
    S: PositionStore + ShipmentSource,
    P: AisProvider,
{
    /// Explains a vessel's standing at `now`.
    pub fn diagnose(&self, name: &VesselName, now: Timestamp) -> Result<Diagnosis, SyncError> {
        let active = self.find_active(name, now)?;
        let state = self.store.load_state(name)?;

        let in_active_set = active.is_some();
        let has_state = state.is_some();
        let has_coordinates = state.as_ref().is_some_and(|s| s.coordinates.is_some());
        let has_identifiers = !known_identifiers(active.as_ref(), state.as_ref()).is_empty();
        let is_fresh = state.as_ref().is_some_and(|s| self.policy.is_fresh(s, now));

        let mut recommendations = Vec::new();
        if !in_active_set {
            recommendations.push(
                "not in the active set: check that a shipment references it with a future or \
                 unknown ETA and a non-cancelled state"
                    .to_string(),
            );
        }
        if !has_state {
            recommendations.push("no position row: run `seed` to create one".to_string());
        }
        if !has_identifiers {
            recommendations.push("no IMO or MMSI: set one with `set-ids`".to_string());
        }
        if has_state && !has_coordinates {
            recommendations.push(if has_identifiers {
                "no coordinates yet: run `sync`, or `refresh` to bypass the freshness window"
                    .to_string()
            } else {
                "no coordinates yet: set identifiers, then `refresh`".to_string()
            });
        }
        if in_active_set && has_state && has_coordinates {
            recommendations.push("should appear on the map".to_string());
        }

        Ok(Diagnosis {
            name: name.clone(),
            in_active_set,
            has_state,
            has_coordinates,
            has_identifiers,
            is_fresh,
            should_appear_on_map: has_state && has_coordinates,
            latest_eta: active.and_then(|a| a.latest_eta),
            state,
            recommendations,
        })
    }

    /// Fetches a vessel now, ignoring the freshness window.
    ///
    /// Still requires identifiers: the provider is never searched by name.
    pub fn force_refresh(
        &self,
        name: &VesselName,
        now: Timestamp,
    ) -> Result<VesselPositionState, RepairError> {
        let active = self.find_active(name, now)?;
        let state = self.store.load_state(name)?;
        let identifiers = known_identifiers(active.as_ref(), state.as_ref());
        if identifiers.is_empty() {
            return Err(RepairError::NoIdentifiers(name.clone()));
        }

        warn!(
            vessel = %name,
            bypass = "freshness-window",
            last_api_call_at = ?state.as_ref().and_then(|s| s.last_api_call_at),
            "forcing provider refresh"
        );

        let identity = VesselIdentity::new(name.clone(), identifiers);
        let snapshot = self
            .provider
            .fetch_position(&identity)
            .ok_or_else(|| RepairError::NoProviderData(name.clone()))?;
        Ok(record_fix(self.store, &identity, &snapshot, now, PositionSource::Forced)?)
    }

    /// Records an operator-supplied provider payload as the vessel's position.
    ///
    /// The payload goes through the same normalisation as a provider response.
    /// No provider call is made.
    pub fn inject_manual(
        &self,
        name: &VesselName,
        payload: &Value,
        now: Timestamp,
    ) -> Result<VesselPositionState, RepairError> {
        let snapshot = parse_snapshot(payload, now)?;
        let active = self.find_active(name, now)?;
        let state = self.store.load_state(name)?;
        let identity = VesselIdentity::new(
            name.clone(),
            known_identifiers(active.as_ref(), state.as_ref()),
        );

        warn!(
            vessel = %name,
            bypass = "manual-payload",
            position_at = %snapshot.position_at,
            "injecting manual position"
        );
        Ok(record_fix(self.store, &identity, &snapshot, now, PositionSource::Manual)?)
    }

    /// Attaches identifiers to a vessel. At least one is required.
    pub fn set_identifiers(
        &self,
        name: &VesselName,
        identifiers: &Identifiers,
        now: Timestamp,
    ) -> Result<VesselPositionState, RepairError> {
        if identifiers.is_empty() {
            return Err(RepairError::NoIdentifiers(name.clone()));
        }
        Ok(self.store.set_identifiers(name, identifiers, now)?)
    }

    fn find_active(
        &self,
        name: &VesselName,
        now: Timestamp,
    ) -> Result<Option<ActiveVesselRef>, SyncError> {
        Ok(self
            .active(now)?
            .into_iter()
            .find(|v| &v.identity.name == name))
    }
}

/// Stored identifiers first, shipment ones filling gaps.
fn known_identifiers(
    active: Option<&ActiveVesselRef>,
    state: Option<&VesselPositionState>,
) -> Identifiers {
    let from_shipments = active.map(|a| a.identity.identifiers.clone()).unwrap_or_default();
    match state {
        Some(state) => state.identifiers.or(&from_shipments),
        None => from_shipments,
    }
}
