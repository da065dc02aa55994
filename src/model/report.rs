//! Run reports returned by the sync and repair surfaces.

use serde::Serialize;
use uuid::Uuid;

use super::vessel::VesselName;

/// Outcome of one sync run. Built once, returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunResult {
    pub run_id: Uuid,
    pub total_active: usize,
    pub updated: Vec<VesselName>,
    pub skipped: Vec<VesselName>,
    pub failed: Vec<FailedVessel>,
    pub missing_identifiers: Vec<VesselName>,
}

impl SyncRunResult {
    pub fn new(run_id: Uuid, total_active: usize) -> Self {
        Self {
            run_id,
            total_active,
            updated: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            missing_identifiers: Vec::new(),
        }
    }
}

/// A vessel the run could not refresh, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedVessel {
    pub name: VesselName,
    pub reason: String,
}
