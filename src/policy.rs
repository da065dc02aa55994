//! Freshness policy: whether a vessel's cached position is worth paying to refresh.
//!
//! The provider bills per call. The policy bounds spend to at most one call per
//! vessel per window, and never spends a call on a vessel that can only be
//! searched by name.

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use crate::model::{ActiveVesselRef, Identifiers, VesselPositionState};

/// Default freshness window.
pub const DEFAULT_WINDOW: SignedDuration = SignedDuration::from_hours(24);

/// What to do with one active vessel this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum Decision {
    /// Call the provider with these identifiers.
    Refresh(Identifiers),
    /// The last call is recent enough.
    SkipFresh,
    /// Neither IMO nor MMSI is known.
    SkipNoIdentifiers,
}

#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    window: SignedDuration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FreshnessPolicy {
    pub fn new(window: SignedDuration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> SignedDuration {
        self.window
    }

    /// Decides for one vessel, given its stored state (if any) and the current time.
    pub fn decide(
        &self,
        vessel: &ActiveVesselRef,
        existing: Option<&VesselPositionState>,
        now: Timestamp,
    ) -> Decision {
        let Some(state) = existing else {
            let identifiers = &vessel.identity.identifiers;
            return if identifiers.is_empty() {
                Decision::SkipNoIdentifiers
            } else {
                Decision::Refresh(identifiers.clone())
            };
        };

        if self.is_fresh(state, now) {
            return Decision::SkipFresh;
        }

        let identifiers = state.identifiers.or(&vessel.identity.identifiers);
        if identifiers.is_empty() {
            Decision::SkipNoIdentifiers
        } else {
            Decision::Refresh(identifiers)
        }
    }

    /// Whether the last provider call for `state` falls inside the window.
    ///
    /// A call timestamp in the future counts as fresh.
    pub fn is_fresh(&self, state: &VesselPositionState, now: Timestamp) -> bool {
        state
            .last_api_call_at
            .is_some_and(|last| now.duration_since(last) < self.window)
    }
}
