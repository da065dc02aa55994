//! Sync orchestration: one end-to-end refresh run over the active vessels.
//!
//! Selection, policy, provider calls, store writes, then one aggregated
//! result. A vessel's failure, including an unreadable state row, is recorded
//! against that vessel and the run moves on. Only failing to read the inputs
//! at all aborts a run, and that happens before any provider call is made.
//!
//! Provider calls run on up to `max_in_flight` scoped worker threads. Store
//! writes stay on the calling thread, in active-set order, so the store is
//! never shared across threads.

mod diagnose;
mod estimate;
mod fleet;
mod restore;

pub use diagnose::{Diagnosis, RepairError};
pub use estimate::CostEstimate;
pub use fleet::ActiveVessel;
pub use restore::RestoreReport;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use jiff::Timestamp;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::model::{
    ActiveVesselRef, FailedVessel, PositionSnapshot, PositionSource, SyncRunResult,
    VesselIdentity, VesselName, VesselPositionState,
};
use crate::policy::{Decision, FreshnessPolicy};
use crate::provider::AisProvider;
use crate::selector::{ShipmentSource, select_active_vessels};
use crate::storage::{self, PositionStore, StorageError};

/// Reason recorded when the provider has nothing usable for a vessel.
pub const NO_PROVIDER_DATA: &str =
    "provider returned no usable position data (unreachable, unconfigured, or no fix for this IMO/MMSI)";

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to read shipments: {0}")]
    Shipments(String),

    #[error("failed to load vessel states: {0}")]
    States(#[from] StorageError),
}

pub struct Synchronizer<'a, S, P> {
    store: &'a S,
    provider: &'a P,
    policy: FreshnessPolicy,
    max_in_flight: usize,
}

impl<'a, S, P> Synchronizer<'a, S, P>
where
    S: PositionStore + ShipmentSource,
    P: AisProvider,
{
    pub fn new(store: &'a S, provider: &'a P, policy: FreshnessPolicy) -> Self {
        Self {
            store,
            provider,
            policy,
            max_in_flight: 1,
        }
    }

    /// Bounds concurrent provider calls. Values below 1 are treated as 1.
    #[must_use]
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Runs one sync at `now`.
    pub fn run(&self, now: Timestamp) -> Result<SyncRunResult, SyncError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync", %run_id);
        let _entered = span.enter();

        let plan = self.plan(now)?;
        info!(
            active = plan.len(),
            window_hours = self.policy.window().as_hours(),
            "starting sync run"
        );

        let targets: Vec<VesselIdentity> = plan
            .iter()
            .filter_map(|(vessel, decision)| match decision {
                Ok(Decision::Refresh(ids)) => {
                    Some(VesselIdentity::new(vessel.identity.name.clone(), ids.clone()))
                }
                Ok(Decision::SkipFresh | Decision::SkipNoIdentifiers) | Err(_) => None,
            })
            .collect();

        let fetched = fetch_all(self.provider, &targets, self.max_in_flight);
        let mut fetched = targets.into_iter().zip(fetched);

        let mut result = SyncRunResult::new(run_id, plan.len());
        for (vessel, decision) in plan {
            let name = vessel.identity.name;
            match decision {
                Err(e) => {
                    error!(vessel = %name, error = %e, "unreadable position row");
                    result.failed.push(FailedVessel {
                        name,
                        reason: format!("unreadable position row: {e}"),
                    });
                }
                Ok(Decision::SkipFresh) => {
                    debug!(vessel = %name, "position is fresh, skipping");
                    result.skipped.push(name);
                }
                Ok(Decision::SkipNoIdentifiers) => {
                    debug!(vessel = %name, "no IMO or MMSI, skipping");
                    result.missing_identifiers.push(name);
                }
                Ok(Decision::Refresh(_)) => {
                    let Some((identity, snapshot)) = fetched.next() else {
                        error!(vessel = %name, "no fetch result for a refresh target");
                        result.failed.push(FailedVessel {
                            name,
                            reason: "no fetch result was recorded".to_string(),
                        });
                        continue;
                    };
                    let Some(snapshot) = snapshot else {
                        warn!(vessel = %name, "provider returned no data");
                        result.failed.push(FailedVessel {
                            name,
                            reason: NO_PROVIDER_DATA.to_string(),
                        });
                        continue;
                    };
                    match record_fix(self.store, &identity, &snapshot, now, PositionSource::Ais) {
                        Ok(_) => result.updated.push(name),
                        Err(e) => result.failed.push(FailedVessel {
                            name,
                            reason: format!("failed to store position: {e}"),
                        }),
                    }
                }
            }
        }

        info!(
            updated = result.updated.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            missing_identifiers = result.missing_identifiers.len(),
            "sync run finished"
        );
        Ok(result)
    }

    /// Selects the active vessels and decides for each, in active-set order.
    ///
    /// A vessel whose state row cannot be read gets that error instead of a
    /// decision.
    fn plan(&self, now: Timestamp) -> Result<Vec<Planned>, SyncError> {
        let active = self.active(now)?;
        let names: Vec<VesselName> = active.iter().map(|v| v.identity.name.clone()).collect();
        let mut states = self.store.load_states(&names)?;
        debug!(active = active.len(), known = states.len(), "loaded vessel states");

        Ok(active
            .into_iter()
            .map(|vessel| {
                let decision = states
                    .remove(&vessel.identity.name)
                    .transpose()
                    .map(|state| self.policy.decide(&vessel, state.as_ref(), now));
                (vessel, decision)
            })
            .collect())
    }

    fn active(&self, now: Timestamp) -> Result<Vec<ActiveVesselRef>, SyncError> {
        let records = self
            .store
            .load_shipments()
            .map_err(|e| SyncError::Shipments(e.to_string()))?;
        Ok(select_active_vessels(&records, now))
    }
}

/// An active vessel with its decision, or the error reading its state row.
type Planned = (ActiveVesselRef, storage::Result<Decision>);

/// Writes a fetched fix: the state row first, then best-effort history.
///
/// A state failure is returned. A history failure is logged and swallowed:
/// the state row stays updated either way.
pub(crate) fn record_fix<S: PositionStore + ?Sized>(
    store: &S,
    identity: &VesselIdentity,
    snapshot: &PositionSnapshot,
    now: Timestamp,
    source: PositionSource,
) -> storage::Result<VesselPositionState> {
    let state = store.upsert_state(identity, snapshot, now).inspect_err(|e| {
        error!(vessel = %identity.name, error = %e, "failed to upsert vessel state");
    })?;

    if let Err(e) = store.append_history(identity, snapshot, source) {
        error!(vessel = %identity.name, error = %e, "failed to append position history");
    }

    Ok(state)
}

/// Fetches every target, at most `max_in_flight` at a time.
///
/// Results come back in target order.
fn fetch_all<P: AisProvider>(
    provider: &P,
    targets: &[VesselIdentity],
    max_in_flight: usize,
) -> Vec<Option<PositionSnapshot>> {
    let workers = max_in_flight.clamp(1, targets.len().max(1));
    if workers == 1 {
        return targets.iter().map(|t| provider.fetch_position(t)).collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<PositionSnapshot>>> =
        targets.iter().map(|_| Mutex::new(None)).collect();

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let at = next.fetch_add(1, Ordering::Relaxed);
                    let Some(target) = targets.get(at) else {
                        break;
                    };
                    let snapshot = provider.fetch_position(target);
                    if let Ok(mut slot) = slots[at].lock() {
                        *slot = snapshot;
                    }
                }
            });
        }
    });

    slots
        .into_iter()
        .map(|slot| slot.into_inner().ok().flatten())
        .collect()
}
