//! Shipment records, as read from the back-office shipment table.
//!
//! Only the columns the sync core cares about are modelled here.

use std::convert::Infallible;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One shipment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    /// Vessel as typed by the operator, usually `"NAME [VOYAGE]"`.
    pub vessel_name_raw: Option<String>,
    pub eta: Option<Timestamp>,
    pub state: ShipmentState,
    pub deleted_at: Option<Timestamp>,

    /// Identifiers, when the operator entered them on the shipment.
    pub imo: Option<String>,
    pub mmsi: Option<String>,
}

/// Booking state of a shipment. Only cancellation matters for tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ShipmentState {
    Cancelled,
    Other(String),
}

impl ShipmentState {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl FromStr for ShipmentState {
    type Err = Infallible;

    /// Parses the stored label. The back-office writes `CANCELADO`;
    /// `CANCELLED` is accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.eq_ignore_ascii_case("CANCELADO") || label.eq_ignore_ascii_case("CANCELLED") {
            Ok(Self::Cancelled)
        } else {
            Ok(Self::Other(label.to_string()))
        }
    }
}

impl From<String> for ShipmentState {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(state) => state,
            Err(never) => match never {},
        }
    }
}

impl From<ShipmentState> for String {
    fn from(state: ShipmentState) -> Self {
        match state {
            ShipmentState::Cancelled => "CANCELADO".to_string(),
            ShipmentState::Other(label) => label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cancelled_labels() {
        assert!("CANCELADO".parse::<ShipmentState>().unwrap().is_cancelled());
        assert!("cancelled".parse::<ShipmentState>().unwrap().is_cancelled());
        assert!(!"CONFIRMADO".parse::<ShipmentState>().unwrap().is_cancelled());
    }

    #[test]
    fn other_states_keep_their_label() {
        let state: ShipmentState = "PENDIENTE".to_string().into();
        assert_eq!(String::from(state), "PENDIENTE");
    }
}
