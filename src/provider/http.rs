//! HTTP implementation of the provider, using blocking `reqwest`.

use std::time::Duration;

use jiff::Timestamp;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ProviderSettings;
use crate::model::{PositionSnapshot, VesselIdentity};

use super::{AisProvider, ProviderError, payload::parse_snapshot};

const USER_AGENT: &str = concat!("vessel-sync/", env!("CARGO_PKG_VERSION"));

/// Provider client speaking the vessel-operations REST API.
pub struct HttpProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpProvider {
    /// Builds a client. A missing API key is allowed: the provider then
    /// answers `None` to everything, so the rest of the crate still runs.
    pub fn new(settings: &ProviderSettings, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// GETs `path` and parses the body as JSON. `None` on any failure.
    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Option<Value> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("provider API key is not configured");
            return None;
        };

        let url = format!("{}/{path}", self.base_url);
        let response = match self
            .client
            .get(&url)
            .query(query)
            .header("accept", "application/json")
            .header("api_key", api_key)
            .send()
        {
            Ok(r) => r,
            Err(e) => {
                warn!(%url, error = %e, "provider request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "provider returned an error status");
            return None;
        }

        let body = match response.bytes() {
            Ok(b) => b,
            Err(e) => {
                warn!(%url, error = %e, "failed to read provider response");
                return None;
            }
        };

        match serde_json::from_slice(&body) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(%url, error = %e, "provider response is not JSON");
                None
            }
        }
    }
}

impl AisProvider for HttpProvider {
    fn fetch_position(&self, identity: &VesselIdentity) -> Option<PositionSnapshot> {
        let Some(key) = identity.identifiers.lookup_key() else {
            warn!(vessel = %identity.name, "refusing provider lookup without IMO or MMSI");
            return None;
        };

        debug!(vessel = %identity.name, key, "fetching position");
        let json = self.get_json("get-vessel-location", &[("imo_or_mmsi", key)])?;

        match parse_snapshot(&json, Timestamp::now()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(vessel = %identity.name, error = %e, "provider payload rejected");
                None
            }
        }
    }

    fn balance(&self) -> Option<f64> {
        let json = self.get_json("account/balance", &[])?;
        let balance = extract_balance(&json);
        if balance.is_none() {
            warn!("provider balance response has no balance field");
        }
        balance
    }
}

/// Reads the credit balance from whichever field the account endpoint uses.
fn extract_balance(json: &Value) -> Option<f64> {
    ["balance", "credits", "remaining_credits"]
        .iter()
        .filter_map(|key| json.get(*key))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}
