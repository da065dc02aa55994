//! Single-vessel commands: diagnose, refresh, inject, set-ids, track.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use jiff::Timestamp;
use serde_json::Value;

use crate::model::{Identifiers, VesselName};
use crate::provider::HttpProvider;
use crate::storage::{PositionStore, Storage};
use crate::sync::Synchronizer;

use super::format::{describe_diagnosis, describe_state};
use super::print_json;

#[derive(Debug, Subcommand)]
pub enum VesselCommand {
    /// Explain why a vessel does or does not appear on the map.
    Diagnose {
        /// Vessel name; a trailing `[voyage]` suffix is ignored.
        name: String,
    },

    /// Fetch a vessel's position now, ignoring the freshness window.
    ///
    /// Spends one provider call. The vessel still needs an IMO or MMSI.
    Refresh {
        name: String,
    },

    /// Record a provider-shaped JSON payload as the vessel's position.
    ///
    /// No provider call is made. The history entry is tagged `manual`.
    Inject {
        name: String,

        /// File holding the JSON payload, bare or wrapped in `detail`.
        #[arg(long)]
        payload: PathBuf,
    },

    /// Attach an IMO and/or MMSI to a vessel.
    SetIds {
        name: String,

        #[arg(long)]
        imo: Option<String>,

        #[arg(long)]
        mmsi: Option<String>,
    },

    /// Print a vessel's recorded position history, oldest first.
    Track {
        name: String,
    },
}

pub(super) fn run(
    command: VesselCommand,
    sync: &Synchronizer<'_, Storage, HttpProvider>,
    storage: &Storage,
    now: Timestamp,
) -> Result<(), String> {
    match command {
        VesselCommand::Diagnose { name } => {
            let name = resolve(&name)?;
            let diagnosis = sync
                .diagnose(&name, now)
                .map_err(|e| format!("failed to diagnose {name}: {e}"))?;
            eprintln!("{}", describe_diagnosis(&diagnosis));
            print_json(&diagnosis)
        }
        VesselCommand::Refresh { name } => {
            let name = resolve(&name)?;
            let state = sync
                .force_refresh(&name, now)
                .map_err(|e| format!("refresh failed: {e}"))?;
            eprintln!("Refreshed {}", describe_state(&state));
            print_json(&state)
        }
        VesselCommand::Inject { name, payload } => {
            let name = resolve(&name)?;
            let payload = read_payload(&payload)?;
            let state = sync
                .inject_manual(&name, &payload, now)
                .map_err(|e| format!("inject failed: {e}"))?;
            eprintln!("Injected {}", describe_state(&state));
            print_json(&state)
        }
        VesselCommand::SetIds { name, imo, mmsi } => {
            let name = resolve(&name)?;
            let identifiers = Identifiers::new(imo.as_deref(), mmsi.as_deref());
            let state = sync
                .set_identifiers(&name, &identifiers, now)
                .map_err(|e| format!("failed to set identifiers: {e}"))?;
            print_json(&state)
        }
        VesselCommand::Track { name } => {
            let name = resolve(&name)?;
            let track = storage
                .load_track(&name)
                .map_err(|e| format!("failed to load track for {name}: {e}"))?;
            eprintln!("{} history entries for {name}", track.len());
            print_json(&track)
        }
    }
}

fn resolve(raw: &str) -> Result<VesselName, String> {
    VesselName::resolve(raw).ok_or_else(|| format!("not a vessel name: '{raw}'"))
}

fn read_payload(path: &Path) -> Result<Value, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&contents).map_err(|e| format!("invalid JSON in {}: {e}", path.display()))
}
