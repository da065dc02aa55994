//! Shipment reads: the storage side of the shipment collaborator.

use jiff::Timestamp;
use tracing::warn;

use crate::model::{ShipmentRecord, ShipmentState, parse_instant};
use crate::selector::ShipmentSource;

use super::{Result, Storage, StorageError};

impl ShipmentSource for Storage {
    type Error = StorageError;

    /// Loads every shipment row. Filtering happens in the selector so the
    /// activity rule lives in one place.
    ///
    /// Back-office times are read leniently. A row whose ETA or deletion time
    /// still cannot be read is logged and left out, like any other
    /// unresolvable record.
    fn load_shipments(&self) -> Result<Vec<ShipmentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT vessel_name_raw, eta, state, deleted_at, imo, mmsi
             FROM shipments
             ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (vessel_name_raw, eta, state, deleted_at, imo, mmsi) = row?;
            let times = back_office_time(eta.as_deref())
                .and_then(|eta| Some((eta, back_office_time(deleted_at.as_deref())?)));
            let Some((eta, deleted_at_parsed)) = times else {
                warn!(
                    vessel = vessel_name_raw.as_deref().unwrap_or(""),
                    eta = eta.as_deref().unwrap_or(""),
                    deleted_at = deleted_at.as_deref().unwrap_or(""),
                    "dropping shipment with an unreadable time"
                );
                continue;
            };
            records.push(ShipmentRecord {
                vessel_name_raw,
                eta,
                state: ShipmentState::from(state),
                deleted_at: deleted_at_parsed,
                imo,
                mmsi,
            });
        }
        Ok(records)
    }
}

/// `Some(None)` for an absent time, `None` for one that cannot be read.
fn back_office_time(raw: Option<&str>) -> Option<Option<Timestamp>> {
    match raw {
        None => Some(None),
        Some(raw) => parse_instant(raw).map(Some),
    }
}

#[cfg(test)]
impl Storage {
    /// Inserts a shipment row. The back-office owns these; only tests write them.
    pub(crate) fn insert_shipment(&self, record: &ShipmentRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO shipments (vessel_name_raw, eta, state, deleted_at, imo, mmsi)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                record.vessel_name_raw,
                record.eta.map(|t| t.to_string()),
                String::from(record.state.clone()),
                record.deleted_at.map(|t| t.to_string()),
                record.imo,
                record.mmsi,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    #[test]
    fn loads_shipments_in_insertion_order() {
        let storage = Storage::open_in_memory().unwrap();
        let eta: Timestamp = "2025-04-01T00:00:00Z".parse().unwrap();
        storage
            .insert_shipment(&ShipmentRecord {
                vessel_name_raw: Some("MSC LAURA [001E]".into()),
                eta: Some(eta),
                state: ShipmentState::Other("CONFIRMADO".into()),
                deleted_at: None,
                imo: None,
                mmsi: None,
            })
            .unwrap();
        storage
            .insert_shipment(&ShipmentRecord {
                vessel_name_raw: None,
                eta: None,
                state: ShipmentState::Cancelled,
                deleted_at: None,
                imo: Some("9839131".into()),
                mmsi: None,
            })
            .unwrap();

        let records = storage.load_shipments().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].eta, Some(eta));
        assert_eq!(records[0].vessel_name_raw.as_deref(), Some("MSC LAURA [001E]"));
        assert!(records[1].state.is_cancelled());
        assert_eq!(records[1].imo.as_deref(), Some("9839131"));
    }

    #[test]
    fn unreadable_eta_drops_only_that_row() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .execute_raw(
                "INSERT INTO shipments (vessel_name_raw, eta, state) VALUES ('X', 'soon', 'OK');
                 INSERT INTO shipments (vessel_name_raw, eta, state)
                     VALUES ('EVER ACE', '2025-03-10T00:00:00Z', 'OK');",
            )
            .unwrap();

        let records = storage.load_shipments().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vessel_name_raw.as_deref(), Some("EVER ACE"));
    }

    #[test]
    fn back_office_times_without_offsets_are_utc() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .execute_raw(
                "INSERT INTO shipments (vessel_name_raw, eta, state, deleted_at)
                     VALUES ('MSC LAURA', '2025-03-10', 'OK', NULL);
                 INSERT INTO shipments (vessel_name_raw, eta, state, deleted_at)
                     VALUES ('EVER ACE', '2025-03-10 06:30:00', 'OK', '2025-02-01 00:00:00');",
            )
            .unwrap();

        let records = storage.load_shipments().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].eta, Some("2025-03-10T00:00:00Z".parse().unwrap()));
        assert_eq!(records[1].eta, Some("2025-03-10T06:30:00Z".parse().unwrap()));
        assert_eq!(
            records[1].deleted_at,
            Some("2025-02-01T00:00:00Z".parse().unwrap())
        );
    }
}
