//! Position history: append fixes and read a vessel's track back.

use rusqlite::params;

use crate::model::{
    Coordinates, HistoryEntry, Identifiers, PositionSnapshot, PositionSource, VesselIdentity,
    VesselName,
};

use super::{Result, Storage, StorageError, parse_name, parse_timestamp};

impl Storage {
    /// Appends one fix. Rows are never updated or deleted.
    pub(super) fn insert_history(
        &self,
        identity: &VesselIdentity,
        snapshot: &PositionSnapshot,
        source: PositionSource,
    ) -> Result<()> {
        let identifiers = identity.identifiers.or(&snapshot.identifiers);
        let details = serde_json::to_string(&snapshot.details)?;
        self.conn.execute(
            "INSERT INTO vessel_position_history
                 (vessel_name, imo, mmsi, lat, lon, position_at, source, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                identity.name.as_str(),
                identifiers.imo,
                identifiers.mmsi,
                snapshot.coordinates.lat,
                snapshot.coordinates.lon,
                snapshot.position_at.to_string(),
                source.as_str(),
                details,
            ],
        )?;
        Ok(())
    }

    /// Distinct vessel names in the order their first entry was recorded.
    pub(super) fn names_with_history(&self) -> Result<Vec<VesselName>> {
        let mut stmt = self.conn.prepare(
            "SELECT vessel_name FROM vessel_position_history
             GROUP BY vessel_name
             ORDER BY MIN(id)",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(parse_name(row?)?);
        }
        Ok(names)
    }

    /// Loads a vessel's history ordered by position time, then insertion order.
    pub(super) fn history_for(&self, name: &VesselName) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT vessel_name, imo, mmsi, lat, lon, position_at, source, details
             FROM vessel_position_history
             WHERE vessel_name = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map([name.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (name, imo, mmsi, lat, lon, position_at, source, details) = row?;
            let coordinates = Coordinates::new(lat, lon).ok_or_else(|| {
                StorageError::Corrupt(format!("{name}: history point out of range ({lat}, {lon})"))
            })?;
            let position_at = parse_timestamp("position_at", Some(position_at))?
                .ok_or_else(|| StorageError::Corrupt("position_at is missing".into()))?;
            let source = PositionSource::parse(&source)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown history source: {source}")))?;

            entries.push(HistoryEntry {
                name: parse_name(name)?,
                identifiers: Identifiers::new(imo.as_deref(), mmsi.as_deref()),
                coordinates,
                position_at,
                source,
                details: serde_json::from_str(&details)?,
            });
        }

        // Stable sort: equal times keep insertion order.
        entries.sort_by_key(|e| e.position_at);
        Ok(entries)
    }
}
