//! Dry-run cost estimate for the next sync.

use jiff::Timestamp;
use serde::Serialize;
use tracing::{info, warn};

use crate::model::VesselName;
use crate::policy::Decision;
use crate::provider::AisProvider;
use crate::selector::ShipmentSource;
use crate::storage::PositionStore;

use super::{SyncError, Synchronizer};

/// What a sync at the same instant would spend, without calling for positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    /// Remaining provider credits. `None` when the balance lookup failed.
    pub provider_balance: Option<f64>,
    pub estimated_cost: f64,
    /// Vessels that would be refreshed.
    pub vessel_count: usize,
    pub total_active: usize,
    pub fresh: usize,
    pub missing_identifiers: usize,
    /// Vessels a run would mark failed because their state row is unreadable.
    pub unreadable_states: usize,
    pub to_refresh: Vec<VesselName>,
}

impl<S, P> Synchronizer<'_, S, P>
where
    S: PositionStore + ShipmentSource,
    P: AisProvider,
{
    /// Estimates the cost of a sync at `now`.
    ///
    /// Uses the same plan as [`Synchronizer::run`], so the count matches what
    /// a run would fetch. The balance lookup is the only provider call.
    pub fn estimate(&self, now: Timestamp, cost_per_vessel: f64) -> Result<CostEstimate, SyncError> {
        let plan = self.plan(now)?;

        let mut estimate = CostEstimate {
            provider_balance: None,
            estimated_cost: 0.0,
            vessel_count: 0,
            total_active: plan.len(),
            fresh: 0,
            missing_identifiers: 0,
            unreadable_states: 0,
            to_refresh: Vec::new(),
        };
        for (vessel, decision) in plan {
            match decision {
                Ok(Decision::Refresh(_)) => estimate.to_refresh.push(vessel.identity.name),
                Ok(Decision::SkipFresh) => estimate.fresh += 1,
                Ok(Decision::SkipNoIdentifiers) => estimate.missing_identifiers += 1,
                Err(e) => {
                    warn!(vessel = %vessel.identity.name, error = %e, "unreadable position row");
                    estimate.unreadable_states += 1;
                }
            }
        }
        estimate.vessel_count = estimate.to_refresh.len();
        #[allow(clippy::cast_precision_loss)]
        {
            estimate.estimated_cost = estimate.vessel_count as f64 * cost_per_vessel;
        }

        estimate.provider_balance = self.provider.balance();
        if estimate.provider_balance.is_none() {
            warn!("provider balance unavailable");
        }

        info!(
            vessels = estimate.vessel_count,
            cost = estimate.estimated_cost,
            "estimated sync cost"
        );
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use crate::policy::FreshnessPolicy;
    use crate::storage::Storage;
    use crate::sync::Synchronizer;
    use crate::sync::tests::{FakeProvider, add_shipment, hours_ago, known_vessel, name, now};

    #[test]
    fn counts_only_vessels_a_run_would_fetch() {
        let storage = Storage::open_in_memory().unwrap();
        add_shipment(&storage, "MSC LAURA [001E]");
        add_shipment(&storage, "EVER ACE [12W]");
        add_shipment(&storage, "HMM BLESSING [7E]");
        add_shipment(&storage, "CAP SAN NICOLAS");
        known_vessel(&storage, "MSC LAURA", "9839131", hours_ago(30));
        known_vessel(&storage, "EVER ACE", "9893890", hours_ago(25));
        known_vessel(&storage, "HMM BLESSING", "9742170", hours_ago(3));
        let provider = FakeProvider::default().with_balance(120.0);

        let estimate = Synchronizer::new(&storage, &provider, FreshnessPolicy::default())
            .estimate(now(), 5.0)
            .unwrap();

        assert_eq!(estimate.total_active, 4);
        assert_eq!(estimate.vessel_count, 2);
        assert_eq!(estimate.to_refresh, vec![name("MSC LAURA"), name("EVER ACE")]);
        assert!((estimate.estimated_cost - 10.0).abs() < f64::EPSILON);
        assert_eq!(estimate.fresh, 1);
        assert_eq!(estimate.missing_identifiers, 1);
        assert_eq!(estimate.provider_balance, Some(120.0));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn unreadable_state_is_counted_not_fatal() {
        let storage = Storage::open_in_memory().unwrap();
        add_shipment(&storage, "MSC LAURA [001E]");
        add_shipment(&storage, "EVER ACE [12W]");
        known_vessel(&storage, "MSC LAURA", "9839131", hours_ago(30));
        known_vessel(&storage, "EVER ACE", "9893890", hours_ago(30));
        storage
            .execute_raw("UPDATE vessel_positions SET raw_payload = '{oops' WHERE vessel_name = 'MSC LAURA'")
            .unwrap();

        let estimate = Synchronizer::new(&storage, &FakeProvider::default(), FreshnessPolicy::default())
            .estimate(now(), 5.0)
            .unwrap();

        assert_eq!(estimate.unreadable_states, 1);
        assert_eq!(estimate.to_refresh, vec![name("EVER ACE")]);
    }

    #[test]
    fn balance_failure_degrades_to_none() {
        let storage = Storage::open_in_memory().unwrap();
        add_shipment(&storage, "MSC LAURA [001E]");
        known_vessel(&storage, "MSC LAURA", "9839131", hours_ago(30));

        let estimate = Synchronizer::new(&storage, &FakeProvider::default(), FreshnessPolicy::default())
            .estimate(now(), 5.0)
            .unwrap();

        assert_eq!(estimate.provider_balance, None);
        assert_eq!(estimate.vessel_count, 1);
    }
}
