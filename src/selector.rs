//! Active vessel selection: which ships live shipments still point at.

use std::collections::HashMap;

use jiff::Timestamp;

use crate::model::{ActiveVesselRef, Identifiers, ShipmentRecord, VesselIdentity, VesselName};

/// Read-only access to the back-office shipment records.
pub trait ShipmentSource {
    type Error: std::error::Error;

    fn load_shipments(&self) -> Result<Vec<ShipmentRecord>, Self::Error>;
}

/// Whether a shipment still needs its vessel tracked at `now`.
///
/// Not soft-deleted, not cancelled, and either no ETA or an ETA in the future.
pub fn is_active(record: &ShipmentRecord, now: Timestamp) -> bool {
    record.deleted_at.is_none()
        && !record.state.is_cancelled()
        && record.eta.is_none_or(|eta| eta > now)
}

/// Groups active shipments by canonical vessel name.
///
/// Records whose vessel field doesn't resolve are dropped. Each vessel keeps
/// the latest ETA seen across its shipments. Output follows the order in
/// which vessels first appear in `records`.
pub fn select_active_vessels(records: &[ShipmentRecord], now: Timestamp) -> Vec<ActiveVesselRef> {
    let mut vessels: Vec<ActiveVesselRef> = Vec::new();
    let mut index: HashMap<VesselName, usize> = HashMap::new();

    for record in records.iter().filter(|r| is_active(r, now)) {
        let Some(name) = record.vessel_name_raw.as_deref().and_then(VesselName::resolve) else {
            continue;
        };
        let identifiers = Identifiers::new(record.imo.as_deref(), record.mmsi.as_deref());

        if let Some(&at) = index.get(&name) {
            let vessel = &mut vessels[at];
            vessel.identity.identifiers = vessel.identity.identifiers.or(&identifiers);
            if let Some(eta) = record.eta
                && vessel.latest_eta.is_none_or(|known| known < eta)
            {
                vessel.latest_eta = Some(eta);
            }
            continue;
        }

        index.insert(name.clone(), vessels.len());
        vessels.push(ActiveVesselRef {
            identity: VesselIdentity::new(name, identifiers),
            latest_eta: record.eta,
        });
    }

    vessels
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::ShipmentState;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn now() -> Timestamp {
        ts("2025-03-01T12:00:00Z")
    }

    fn shipment(raw: &str, eta: Option<&str>) -> ShipmentRecord {
        ShipmentRecord {
            vessel_name_raw: Some(raw.to_string()),
            eta: eta.map(ts),
            state: ShipmentState::Other("CONFIRMADO".into()),
            deleted_at: None,
            imo: None,
            mmsi: None,
        }
    }

    fn names(vessels: &[ActiveVesselRef]) -> Vec<&str> {
        vessels.iter().map(|v| v.identity.name.as_str()).collect()
    }

    #[test]
    fn groups_voyages_of_the_same_ship() {
        let records = vec![
            shipment("MSC LAURA [001E]", Some("2025-03-10T00:00:00Z")),
            shipment("MSC LAURA [002W]", Some("2025-04-02T00:00:00Z")),
            shipment("HMM BLESSING", None),
        ];

        let vessels = select_active_vessels(&records, now());
        assert_eq!(names(&vessels), vec!["MSC LAURA", "HMM BLESSING"]);
        assert_eq!(vessels[0].latest_eta, Some(ts("2025-04-02T00:00:00Z")));
        assert_eq!(vessels[1].latest_eta, None);
    }

    #[test]
    fn keeps_latest_eta_regardless_of_order() {
        let records = vec![
            shipment("MSC LAURA [002W]", Some("2025-04-02T00:00:00Z")),
            shipment("MSC LAURA [003E]", None),
            shipment("MSC LAURA [001E]", Some("2025-03-10T00:00:00Z")),
        ];

        let vessels = select_active_vessels(&records, now());
        assert_eq!(vessels.len(), 1);
        assert_eq!(vessels[0].latest_eta, Some(ts("2025-04-02T00:00:00Z")));
    }

    #[test]
    fn null_eta_first_is_replaced_by_later_known_eta() {
        let records = vec![
            shipment("MSC LAURA", None),
            shipment("MSC LAURA", Some("2025-03-10T00:00:00Z")),
        ];

        let vessels = select_active_vessels(&records, now());
        assert_eq!(vessels[0].latest_eta, Some(ts("2025-03-10T00:00:00Z")));
    }

    #[test]
    fn excludes_inactive_shipments() {
        let mut cancelled = shipment("CANCELLED SHIP", None);
        cancelled.state = ShipmentState::Cancelled;

        let mut deleted = shipment("DELETED SHIP", None);
        deleted.deleted_at = Some(ts("2025-02-01T00:00:00Z"));

        let arrived = shipment("ARRIVED SHIP", Some("2025-02-20T00:00:00Z"));
        let arriving_now = shipment("ARRIVING SHIP", Some("2025-03-01T12:00:00Z"));

        let records = vec![cancelled, deleted, arrived, arriving_now];
        assert!(select_active_vessels(&records, now()).is_empty());
    }

    #[test]
    fn drops_records_without_a_name() {
        let mut nameless = shipment("", None);
        nameless.vessel_name_raw = None;
        let records = vec![nameless, shipment("   ", None), shipment("EVER ACE", None)];

        let vessels = select_active_vessels(&records, now());
        assert_eq!(names(&vessels), vec!["EVER ACE"]);
    }

    #[test]
    fn does_not_merge_names_that_differ_in_case() {
        let records = vec![shipment("MSC Laura", None), shipment("MSC LAURA", None)];

        let vessels = select_active_vessels(&records, now());
        assert_eq!(vessels.len(), 2);
    }

    #[test]
    fn collects_identifiers_from_any_shipment() {
        let mut with_imo = shipment("MSC LAURA [002W]", None);
        with_imo.imo = Some("9839131".into());
        let records = vec![shipment("MSC LAURA [001E]", None), with_imo];

        let vessels = select_active_vessels(&records, now());
        assert_eq!(
            vessels[0].identity.identifiers.imo.as_deref(),
            Some("9839131")
        );
    }
}
