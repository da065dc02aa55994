//! Output formatting for CLI display.

use std::fmt::Write;

use crate::model::{SyncRunResult, VesselPositionState};
use crate::sync::{CostEstimate, Diagnosis, RestoreReport};

/// One-line summary of a sync run.
pub(super) fn describe_run(result: &SyncRunResult) -> String {
    let mut line = format!(
        "{} active: {} updated, {} fresh, {} failed, {} missing IMO/MMSI",
        result.total_active,
        result.updated.len(),
        result.skipped.len(),
        result.failed.len(),
        result.missing_identifiers.len(),
    );
    for failed in &result.failed {
        let _ = write!(line, "\n  {}: {}", failed.name, failed.reason);
    }
    line
}

pub(super) fn describe_estimate(estimate: &CostEstimate) -> String {
    let balance = match estimate.provider_balance {
        Some(b) => format!("{b} credits available"),
        None => "balance unavailable".to_string(),
    };
    let mut line = format!(
        "{} of {} active vessels to refresh, ~{} credits ({balance})",
        estimate.vessel_count, estimate.total_active, estimate.estimated_cost,
    );
    if estimate.unreadable_states > 0 {
        let _ = write!(line, ", {} with unreadable state rows", estimate.unreadable_states);
    }
    line
}

pub(super) fn describe_restore(report: &RestoreReport) -> String {
    let mut line = format!(
        "{} restored from history, {} already current, {} failed",
        report.restored.len(),
        report.skipped.len(),
        report.failed.len(),
    );
    for failed in &report.failed {
        let _ = write!(line, "\n  {}: {}", failed.name, failed.reason);
    }
    line
}

pub(super) fn describe_diagnosis(diagnosis: &Diagnosis) -> String {
    let verdict = if diagnosis.should_appear_on_map {
        "on map"
    } else {
        "not on map"
    };
    let mut out = format!("{} ({verdict})", diagnosis.name);
    for recommendation in &diagnosis.recommendations {
        let _ = write!(out, "\n  - {recommendation}");
    }
    out
}

pub(super) fn describe_state(state: &VesselPositionState) -> String {
    match (state.coordinates, state.last_position_at) {
        (Some(c), Some(at)) => format!("{} at {:.4}, {:.4} ({at})", state.name, c.lat, c.lon),
        (Some(c), None) => format!("{} at {:.4}, {:.4}", state.name, c.lat, c.lon),
        _ => format!("{} (no position)", state.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use uuid::Uuid;

    use crate::model::{Coordinates, FailedVessel, Identifiers, VesselName};

    fn laura() -> VesselName {
        VesselName::resolve("MSC LAURA").unwrap()
    }

    #[test]
    fn run_summary_lists_failures() {
        let mut result = SyncRunResult::new(Uuid::nil(), 3);
        result.updated.push(laura());
        result.failed.push(FailedVessel {
            name: VesselName::resolve("EVER ACE").unwrap(),
            reason: "timeout".into(),
        });

        let summary = describe_run(&result);
        assert!(summary.starts_with("3 active: 1 updated, 0 fresh, 1 failed"));
        assert!(summary.contains("EVER ACE: timeout"));
    }

    #[test]
    fn estimate_summary_mentions_unreadable_rows() {
        let mut estimate = CostEstimate {
            provider_balance: None,
            estimated_cost: 10.0,
            vessel_count: 2,
            total_active: 4,
            fresh: 1,
            missing_identifiers: 0,
            unreadable_states: 0,
            to_refresh: vec![laura()],
        };
        assert_eq!(
            describe_estimate(&estimate),
            "2 of 4 active vessels to refresh, ~10 credits (balance unavailable)"
        );

        estimate.unreadable_states = 1;
        assert!(describe_estimate(&estimate).ends_with(", 1 with unreadable state rows"));
    }

    #[test]
    fn restore_summary_lists_failures() {
        let report = RestoreReport {
            restored: vec![laura()],
            skipped: Vec::new(),
            failed: vec![FailedVessel {
                name: VesselName::resolve("EVER ACE").unwrap(),
                reason: "locked".into(),
            }],
        };

        let summary = describe_restore(&report);
        assert!(summary.starts_with("1 restored from history, 0 already current, 1 failed"));
        assert!(summary.contains("EVER ACE: locked"));
    }

    #[test]
    fn state_summary_handles_missing_position() {
        let mut state = VesselPositionState::bare(laura(), Identifiers::default());
        assert_eq!(describe_state(&state), "MSC LAURA (no position)");

        state.coordinates = Coordinates::new(-33.04, -71.62);
        assert_eq!(describe_state(&state), "MSC LAURA at -33.0400, -71.6200");
    }
}
