//! Rebuilds state rows from recorded history, without calling the provider.

use jiff::Timestamp;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::model::{FailedVessel, HistoryEntry, VesselName};
use crate::provider::AisProvider;
use crate::selector::ShipmentSource;
use crate::storage::{self, PositionStore};

use super::{SyncError, Synchronizer};

/// What a restore changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    /// Vessels whose state row now points at their latest history entry.
    pub restored: Vec<VesselName>,
    /// Vessels whose state row was already as recent as their history.
    pub skipped: Vec<VesselName>,
    pub failed: Vec<FailedVessel>,
}

impl<S, P> Synchronizer<'_, S, P>
where
    S: PositionStore + ShipmentSource,
    P: AisProvider,
{
    /// Points each vessel's state row at its latest history entry when the
    /// row is missing or older.
    ///
    /// Covers fixes that made it into history but not into the state row.
    /// `last_api_call_at` is never touched, so the freshness window still
    /// reflects real provider calls.
    pub fn restore_from_history(&self, now: Timestamp) -> Result<RestoreReport, SyncError> {
        let names = self.store.history_vessels()?;
        let mut report = RestoreReport::default();

        for name in names {
            match self.restore_one(&name, now) {
                Ok(true) => report.restored.push(name),
                Ok(false) => report.skipped.push(name),
                Err(e) => {
                    error!(vessel = %name, error = %e, "failed to restore from history");
                    report.failed.push(FailedVessel {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            restored = report.restored.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "restore from history finished"
        );
        Ok(report)
    }

    /// Returns whether the state row was rewritten.
    fn restore_one(&self, name: &VesselName, now: Timestamp) -> storage::Result<bool> {
        let Some(latest) = self.store.load_track(name)?.pop() else {
            return Ok(false);
        };
        let current = self
            .store
            .load_state(name)?
            .and_then(|s| s.last_position_at);
        if current.is_some_and(|at| at >= latest.position_at) {
            debug!(vessel = %name, "state row is as recent as history");
            return Ok(false);
        }

        log_restore(&latest, current);
        self.store.restore_position(&latest, now)?;
        Ok(true)
    }
}

fn log_restore(entry: &HistoryEntry, current: Option<Timestamp>) {
    warn!(
        vessel = %entry.name,
        bypass = "history-restore",
        source = entry.source.as_str(),
        position_at = %entry.position_at,
        previous_position_at = ?current,
        "restoring position from history"
    );
}
