//! The AIS tracking provider: a metered, per-call-billed position lookup.
//!
//! The sync core only talks to [`AisProvider`]. Implementations swallow every
//! ordinary failure (network, HTTP status, missing data, malformed payload)
//! and report it as `None`, logging the cause.

mod http;
mod payload;

pub use http::HttpProvider;
pub use payload::{PayloadError, parse_snapshot};

use crate::model::{PositionSnapshot, VesselIdentity};

/// Errors raised while building a provider, never while using one.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub trait AisProvider: Send + Sync {
    /// Looks up the latest fix for a vessel.
    ///
    /// Callers must supply at least one of IMO or MMSI.
    fn fetch_position(&self, identity: &VesselIdentity) -> Option<PositionSnapshot>;

    /// Remaining account credits, when the provider exposes them.
    fn balance(&self) -> Option<f64>;
}
