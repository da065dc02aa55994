//! Core data model for vessel position sync.
//!
//! Vessel identity, shipment records, provider snapshots, the persisted
//! position shapes, and the reports handed back to callers.

mod instant;
mod position;
mod report;
mod shipment;
mod snapshot;
mod vessel;

pub use instant::parse_instant;
pub use position::{HistoryEntry, PositionSource, TrackPoint, VesselPositionState};
pub use report::{FailedVessel, SyncRunResult};
pub use shipment::{ShipmentRecord, ShipmentState};
pub use snapshot::{Coordinates, PositionSnapshot, VesselDetails};
pub use vessel::{ActiveVesselRef, Identifiers, VesselIdentity, VesselName};
