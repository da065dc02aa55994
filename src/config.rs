//! Vessel-sync configuration.
//!
//! Loaded from `~/.vessel-sync/config.toml`. Every field has a default, so a
//! missing file is a valid configuration.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// SQLite database holding shipments and vessel positions.
    /// Defaults to `~/.vessel-sync/vessels.sqlite`.
    pub database: Option<PathBuf>,

    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,

    pub policy: PolicySettings,
    pub provider: ProviderSettings,
    pub sync: SyncSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            log_level: "info".to_string(),
            policy: PolicySettings::default(),
            provider: ProviderSettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolicySettings {
    /// Minimum hours between provider calls for one vessel.
    pub freshness_hours: u32,

    /// Provider credits billed per vessel lookup.
    pub cost_per_vessel: f64,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            freshness_hours: 24,
            cost_per_vessel: 5.0,
        }
    }
}

impl PolicySettings {
    pub fn window(&self) -> SignedDuration {
        SignedDuration::from_hours(i64::from(self.freshness_hours))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProviderSettings {
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    /// The key itself never lives in the config file.
    pub api_key_env: String,

    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://datadocked.com/api/vessels_operations".to_string(),
            api_key_env: "VESSEL_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ProviderSettings {
    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SyncSettings {
    /// Upper bound on concurrent provider calls within a run.
    pub max_in_flight: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { max_in_flight: 4 }
    }
}

impl Config {
    /// Load config from `~/.vessel-sync/config.toml`, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        Self::parse(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// Parse and validate config text.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.policy.freshness_hours == 0 {
            return Err("policy.freshness-hours must be at least 1".to_string());
        }
        if !self.policy.cost_per_vessel.is_finite() || self.policy.cost_per_vessel < 0.0 {
            return Err("policy.cost-per-vessel must be a non-negative number".to_string());
        }
        if self.sync.max_in_flight == 0 {
            return Err("sync.max-in-flight must be at least 1".to_string());
        }
        if self.provider.base_url.trim().is_empty() {
            return Err("provider.base-url is empty".to_string());
        }
        Ok(())
    }

    /// The database path: configured, or `~/.vessel-sync/vessels.sqlite`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .clone()
            .or_else(|| Self::root().map(|r| r.join("vessels.sqlite")))
    }

    /// The config file path: `~/.vessel-sync/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Self::root().map(|r| r.join("config.toml"))
    }

    fn root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".vessel-sync"))
    }
}
