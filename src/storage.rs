//! Local persistence for shipments and vessel positions.
//!
//! One `SQLite` database holds three tables:
//!
//! ```text
//! shipments                  # back-office shipment rows (read-only here)
//! vessel_positions           # one current-state row per canonical vessel name
//! vessel_position_history    # append-only fixes, one per successful fetch
//! ```

mod history;
mod positions;
mod shipments;

use std::collections::HashMap;
use std::path::Path;

use jiff::Timestamp;
use rusqlite::Connection;

use crate::model::{
    HistoryEntry, Identifiers, PositionSnapshot, PositionSource, VesselIdentity, VesselName,
    VesselPositionState,
};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("vessel not found: {0}")]
    VesselNotFound(VesselName),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt data: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// State rows keyed by vessel. A row that fails to parse is an `Err` for that
/// vessel alone.
pub type StateMap = HashMap<VesselName, Result<VesselPositionState>>;

/// The persistence boundary the sync core writes through.
///
/// State rows are keyed by canonical name. History is append-only.
pub trait PositionStore {
    /// Loads the state row for one vessel, if it has one.
    fn load_state(&self, name: &VesselName) -> Result<Option<VesselPositionState>>;

    /// Loads state rows for exactly the given vessels. Missing rows are absent.
    fn load_states(&self, names: &[VesselName]) -> Result<StateMap>;

    /// Inserts or updates the state row from a fresh snapshot.
    ///
    /// `last_api_call_at` becomes `now`; `last_position_at` becomes the
    /// snapshot's claimed time.
    fn upsert_state(
        &self,
        identity: &VesselIdentity,
        snapshot: &PositionSnapshot,
        now: Timestamp,
    ) -> Result<VesselPositionState>;

    /// Records one fix in the vessel's history.
    fn append_history(
        &self,
        identity: &VesselIdentity,
        snapshot: &PositionSnapshot,
        source: PositionSource,
    ) -> Result<()>;

    /// The vessel's history, oldest fix first.
    fn load_track(&self, name: &VesselName) -> Result<Vec<HistoryEntry>>;

    /// Attaches identifiers to a vessel, creating a bare row if it has none.
    ///
    /// Identifiers given here replace stored ones; absent ones are kept.
    fn set_identifiers(
        &self,
        name: &VesselName,
        identifiers: &Identifiers,
        now: Timestamp,
    ) -> Result<VesselPositionState>;

    /// Every vessel with at least one history entry, in first-recorded order.
    fn history_vessels(&self) -> Result<Vec<VesselName>>;

    /// Points the state row at a history entry, creating the row if needed.
    ///
    /// Coordinates, position time and details come from the entry; stored
    /// identifiers win. `last_api_call_at` and the raw payload are left as
    /// they are, since no provider call was made.
    fn restore_position(&self, entry: &HistoryEntry, now: Timestamp) -> Result<VesselPositionState>;

    /// Creates bare rows for the vessels that have none.
    ///
    /// Returns the names that were created, in input order.
    fn seed_missing(&self, names: &[VesselName], now: Timestamp) -> Result<Vec<VesselName>>;
}

/// `SQLite`-backed storage.
pub struct Storage {
    conn: Connection,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS shipments (
        id              INTEGER PRIMARY KEY,
        vessel_name_raw TEXT,
        eta             TEXT,
        state           TEXT NOT NULL,
        deleted_at      TEXT,
        imo             TEXT,
        mmsi            TEXT
    );

    CREATE TABLE IF NOT EXISTS vessel_positions (
        vessel_name      TEXT PRIMARY KEY,
        imo              TEXT,
        mmsi             TEXT,
        last_lat         REAL,
        last_lon         REAL,
        last_position_at TEXT,
        last_api_call_at TEXT,
        raw_payload      TEXT,
        details          TEXT NOT NULL DEFAULT '{}',
        updated_at       TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vessel_position_history (
        id          INTEGER PRIMARY KEY,
        vessel_name TEXT NOT NULL,
        imo         TEXT,
        mmsi        TEXT,
        lat         REAL NOT NULL,
        lon         REAL NOT NULL,
        position_at TEXT NOT NULL,
        source      TEXT NOT NULL,
        details     TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS vessel_position_history_by_name
        ON vessel_position_history (vessel_name);
";

impl Storage {
    /// Opens (or creates) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Runs raw SQL, for planting rows other writers could have left behind.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

/// Parses an optional stored timestamp column.
fn parse_timestamp(column: &str, value: Option<String>) -> Result<Option<Timestamp>> {
    value
        .map(|raw| {
            raw.parse::<Timestamp>()
                .map_err(|e| StorageError::Corrupt(format!("invalid {column} '{raw}': {e}")))
        })
        .transpose()
}

fn parse_name(value: String) -> Result<VesselName> {
    VesselName::try_from(value).map_err(StorageError::Corrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vessels.sqlite");

        Storage::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn reopening_keeps_schema_and_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vessels.sqlite");
        let name = VesselName::resolve("MSC LAURA").unwrap();

        {
            let storage = Storage::open(&path).unwrap();
            let ids = Identifiers::new(Some("9839131"), None);
            storage
                .set_identifiers(&name, &ids, Timestamp::UNIX_EPOCH)
                .unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        let state = storage.load_state(&name).unwrap().unwrap();
        assert_eq!(state.identifiers.imo.as_deref(), Some("9839131"));
    }

    #[test]
    fn rejects_corrupt_timestamps() {
        let err = parse_timestamp("eta", Some("not a time".into())).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
        assert_eq!(parse_timestamp("eta", None).unwrap(), None);
    }
}
