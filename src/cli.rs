//! CLI interface for vessel-sync.
//!
//! Every command is non-interactive: arguments in, JSON on stdout. A short
//! human-readable summary goes to stderr alongside the logs.
//!
//! Commands split into two groups:
//!
//! - fleet-wide: `sync`, `estimate`, `active`, `seed`, `restore`
//! - one vessel: `diagnose`, `refresh`, `inject`, `set-ids`, `track`
//!
//! Vessel names go through the same resolution as shipment names, so
//! `"MSC LAURA [001E]"` and `"MSC LAURA"` address the same vessel.

mod format;
mod vessel;

use clap::{Parser, Subcommand};
use jiff::Timestamp;
use serde::Serialize;

use crate::config::Config;
use crate::policy::FreshnessPolicy;
use crate::provider::HttpProvider;
use crate::storage::Storage;
use crate::sync::Synchronizer;

use format::{describe_estimate, describe_restore, describe_run};
use vessel::VesselCommand;

/// Keep cached vessel positions fresh without overspending provider credits.
#[derive(Debug, Parser)]
#[command(name = "vessel-sync", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: getting a vessel on the map
  1. vessel-sync seed
  2. vessel-sync diagnose "MSC LAURA [001E]"
  3. vessel-sync set-ids "MSC LAURA" --imo 9839131
  4. vessel-sync estimate
  5. vessel-sync sync

Repairs:
  vessel-sync refresh "MSC LAURA"
  vessel-sync inject "MSC LAURA" --payload fix.json
  vessel-sync restore"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh stale positions for every active vessel.
    ///
    /// Prints the run result: updated, skipped, failed, and vessels missing
    /// an IMO/MMSI.
    Sync,

    /// Show what a sync right now would cost, without fetching positions.
    Estimate,

    /// List active vessels with their last known position and track.
    Active,

    /// Create empty position rows for active vessels that have none.
    Seed,

    /// Point position rows at their latest history entry where it is newer.
    ///
    /// Makes no provider calls and leaves the last call time alone, so the
    /// next sync still sees the real freshness.
    Restore,

    #[command(flatten)]
    Vessel(VesselCommand),
}

/// Run a parsed command, returning an error message on failure.
pub fn run(
    cli: Cli,
    config: &Config,
    storage: &Storage,
    provider: &HttpProvider,
) -> Result<(), String> {
    let sync = Synchronizer::new(storage, provider, FreshnessPolicy::new(config.policy.window()))
        .max_in_flight(config.sync.max_in_flight);
    let now = Timestamp::now();

    match cli.command {
        Command::Sync => cmd_sync(&sync, now),
        Command::Estimate => cmd_estimate(&sync, config, now),
        Command::Active => {
            let view = sync
                .active_view(now)
                .map_err(|e| format!("failed to load active vessels: {e}"))?;
            eprintln!("{} active vessels", view.len());
            print_json(&view)
        }
        Command::Seed => {
            let created = sync
                .seed(now)
                .map_err(|e| format!("failed to seed vessels: {e}"))?;
            eprintln!("Seeded {} vessels", created.len());
            print_json(&created)
        }
        Command::Restore => {
            let report = sync
                .restore_from_history(now)
                .map_err(|e| format!("failed to restore from history: {e}"))?;
            eprintln!("{}", describe_restore(&report));
            print_json(&report)
        }
        Command::Vessel(command) => vessel::run(command, &sync, storage, now),
    }
}

fn cmd_sync(sync: &Synchronizer<'_, Storage, HttpProvider>, now: Timestamp) -> Result<(), String> {
    let result = sync.run(now).map_err(|e| format!("sync failed: {e}"))?;
    eprintln!("{}", describe_run(&result));
    print_json(&result)
}

fn cmd_estimate(
    sync: &Synchronizer<'_, Storage, HttpProvider>,
    config: &Config,
    now: Timestamp,
) -> Result<(), String> {
    let estimate = sync
        .estimate(now, config.policy.cost_per_vessel)
        .map_err(|e| format!("failed to estimate: {e}"))?;
    eprintln!("{}", describe_estimate(&estimate));
    print_json(&estimate)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_vessel_commands() {
        let cli = Cli::try_parse_from([
            "vessel-sync",
            "set-ids",
            "MSC LAURA [001E]",
            "--imo",
            "9839131",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Vessel(VesselCommand::SetIds { ref imo, mmsi: None, .. }) if imo.as_deref() == Some("9839131")
        ));

        let cli = Cli::try_parse_from(["vessel-sync", "inject", "EVER ACE", "--payload", "fix.json"])
            .unwrap();
        assert!(matches!(cli.command, Command::Vessel(VesselCommand::Inject { .. })));
    }

    #[test]
    fn parses_restore() {
        let cli = Cli::try_parse_from(["vessel-sync", "restore"]).unwrap();
        assert!(matches!(cli.command, Command::Restore));
    }

    #[test]
    fn inject_requires_payload() {
        assert!(Cli::try_parse_from(["vessel-sync", "inject", "EVER ACE"]).is_err());
    }
}
