//! Vessel state rows: load, upsert from a snapshot, seed, and set identifiers.

use jiff::Timestamp;
use rusqlite::{OptionalExtension, Row, params};

use crate::model::{
    Coordinates, HistoryEntry, Identifiers, PositionSnapshot, PositionSource, VesselIdentity,
    VesselName, VesselPositionState,
};

use super::{
    PositionStore, Result, StateMap, Storage, StorageError, parse_name, parse_timestamp,
};

const STATE_COLUMNS: &str = "vessel_name, imo, mmsi, last_lat, last_lon, \
     last_position_at, last_api_call_at, raw_payload, details";

impl PositionStore for Storage {
    fn load_state(&self, name: &VesselName) -> Result<Option<VesselPositionState>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {STATE_COLUMNS} FROM vessel_positions WHERE vessel_name = ?1"),
                [name.as_str()],
                StateRow::read,
            )
            .optional()?;
        row.map(StateRow::into_state).transpose()
    }

    fn load_states(&self, names: &[VesselName]) -> Result<StateMap> {
        let mut states = StateMap::new();
        if names.is_empty() {
            return Ok(states);
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STATE_COLUMNS} FROM vessel_positions WHERE vessel_name IN ({placeholders})"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(names.iter().map(VesselName::as_str)),
            |row| Ok((row.get::<_, String>(0)?, StateRow::read(row))),
        )?;
        for row in rows {
            let (raw_name, read) = row?;
            // A blank stored name never matches a requested one.
            let Ok(name) = VesselName::try_from(raw_name) else {
                continue;
            };
            let state = read.map_err(StorageError::from).and_then(StateRow::into_state);
            states.insert(name, state);
        }
        Ok(states)
    }

    fn upsert_state(
        &self,
        identity: &VesselIdentity,
        snapshot: &PositionSnapshot,
        now: Timestamp,
    ) -> Result<VesselPositionState> {
        let identifiers = identity.identifiers.or(&snapshot.identifiers);
        let details = serde_json::to_string(&snapshot.details)?;
        let raw_payload = serde_json::to_string(&snapshot.raw_payload)?;

        // Stored identifiers win; the snapshot only fills gaps.
        self.conn.execute(
            "INSERT INTO vessel_positions (
                 vessel_name, imo, mmsi, last_lat, last_lon, last_position_at,
                 last_api_call_at, raw_payload, details, updated_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?7)
             ON CONFLICT (vessel_name) DO UPDATE SET
                 imo = COALESCE(vessel_positions.imo, excluded.imo),
                 mmsi = COALESCE(vessel_positions.mmsi, excluded.mmsi),
                 last_lat = excluded.last_lat,
                 last_lon = excluded.last_lon,
                 last_position_at = excluded.last_position_at,
                 last_api_call_at = excluded.last_api_call_at,
                 raw_payload = excluded.raw_payload,
                 details = excluded.details,
                 updated_at = excluded.updated_at",
            params![
                identity.name.as_str(),
                identifiers.imo,
                identifiers.mmsi,
                snapshot.coordinates.lat,
                snapshot.coordinates.lon,
                snapshot.position_at.to_string(),
                now.to_string(),
                raw_payload,
                details,
            ],
        )?;

        self.load_state(&identity.name)?
            .ok_or_else(|| StorageError::VesselNotFound(identity.name.clone()))
    }

    fn append_history(
        &self,
        identity: &VesselIdentity,
        snapshot: &PositionSnapshot,
        source: PositionSource,
    ) -> Result<()> {
        self.insert_history(identity, snapshot, source)
    }

    fn load_track(&self, name: &VesselName) -> Result<Vec<HistoryEntry>> {
        self.history_for(name)
    }

    fn history_vessels(&self) -> Result<Vec<VesselName>> {
        self.names_with_history()
    }

    fn restore_position(&self, entry: &HistoryEntry, now: Timestamp) -> Result<VesselPositionState> {
        let details = serde_json::to_string(&entry.details)?;
        self.conn.execute(
            "INSERT INTO vessel_positions (
                 vessel_name, imo, mmsi, last_lat, last_lon, last_position_at, details, updated_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (vessel_name) DO UPDATE SET
                 imo = COALESCE(vessel_positions.imo, excluded.imo),
                 mmsi = COALESCE(vessel_positions.mmsi, excluded.mmsi),
                 last_lat = excluded.last_lat,
                 last_lon = excluded.last_lon,
                 last_position_at = excluded.last_position_at,
                 details = excluded.details,
                 updated_at = excluded.updated_at",
            params![
                entry.name.as_str(),
                entry.identifiers.imo,
                entry.identifiers.mmsi,
                entry.coordinates.lat,
                entry.coordinates.lon,
                entry.position_at.to_string(),
                details,
                now.to_string(),
            ],
        )?;

        self.load_state(&entry.name)?
            .ok_or_else(|| StorageError::VesselNotFound(entry.name.clone()))
    }

    fn set_identifiers(
        &self,
        name: &VesselName,
        identifiers: &Identifiers,
        now: Timestamp,
    ) -> Result<VesselPositionState> {
        self.conn.execute(
            "INSERT INTO vessel_positions (vessel_name, imo, mmsi, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (vessel_name) DO UPDATE SET
                 imo = COALESCE(excluded.imo, vessel_positions.imo),
                 mmsi = COALESCE(excluded.mmsi, vessel_positions.mmsi),
                 updated_at = excluded.updated_at",
            params![
                name.as_str(),
                identifiers.imo,
                identifiers.mmsi,
                now.to_string(),
            ],
        )?;

        self.load_state(name)?
            .ok_or_else(|| StorageError::VesselNotFound(name.clone()))
    }

    fn seed_missing(&self, names: &[VesselName], now: Timestamp) -> Result<Vec<VesselName>> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO vessel_positions (vessel_name, updated_at) VALUES (?1, ?2)",
        )?;
        let stamp = now.to_string();
        let mut created = Vec::new();
        for name in names {
            if stmt.execute(params![name.as_str(), stamp])? > 0 {
                created.push(name.clone());
            }
        }
        Ok(created)
    }
}

/// Raw column values of a `vessel_positions` row.
struct StateRow {
    name: String,
    imo: Option<String>,
    mmsi: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    last_position_at: Option<String>,
    last_api_call_at: Option<String>,
    raw_payload: Option<String>,
    details: String,
}

impl StateRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            imo: row.get(1)?,
            mmsi: row.get(2)?,
            lat: row.get(3)?,
            lon: row.get(4)?,
            last_position_at: row.get(5)?,
            last_api_call_at: row.get(6)?,
            raw_payload: row.get(7)?,
            details: row.get(8)?,
        })
    }

    fn into_state(self) -> Result<VesselPositionState> {
        let name = parse_name(self.name)?;
        let coordinates = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon).ok_or_else(|| {
                StorageError::Corrupt(format!("{name}: coordinates out of range ({lat}, {lon})"))
            })?),
            (None, None) => None,
            _ => {
                return Err(StorageError::Corrupt(format!(
                    "{name}: only one coordinate is set"
                )));
            }
        };

        Ok(VesselPositionState {
            identifiers: Identifiers::new(self.imo.as_deref(), self.mmsi.as_deref()),
            coordinates,
            last_position_at: parse_timestamp("last_position_at", self.last_position_at)?,
            last_api_call_at: parse_timestamp("last_api_call_at", self.last_api_call_at)?,
            raw_payload: self
                .raw_payload
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            details: serde_json::from_str(&self.details)?,
            name,
        })
    }
}
