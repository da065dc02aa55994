mod cli;
mod config;
mod logging;
mod model;
mod policy;
mod provider;
mod selector;
mod storage;
mod sync;

use std::process;

use clap::Parser;
use tracing::warn;

use cli::Cli;
use config::Config;
use provider::HttpProvider;
use storage::Storage;

fn main() {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}");
        process::exit(1);
    });

    logging::init(&config.log_level);

    let path = config.database_path().unwrap_or_else(|| {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    });

    let storage = match Storage::open(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open {}: {e}", path.display());
            process::exit(1);
        }
    };

    let provider = match HttpProvider::new(&config.provider, config.provider.api_key()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize provider: {e}");
            process::exit(1);
        }
    };
    if !provider.is_configured() {
        warn!(
            env = %config.provider.api_key_env,
            "no provider API key set; position fetches and balance checks will fail"
        );
    }

    if let Err(e) = cli::run(cli, &config, &storage, &provider) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
