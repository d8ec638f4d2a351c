//! Best-effort enrichment of analytics with the client's public IP address.
//!
//! Nothing here ever fails the caller: lookup and property errors are logged at debug level
//! and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::analytics::api::{Analytics, LOGGER};
use crate::analytics::error::{internal_error, network_error, AnalyticsError, AnalyticsResult};
use crate::platform::environment::BuildMode;
use crate::platform::runtime::spawn_detached;

pub const IPIFY_ENDPOINT: &str = "https://api.ipify.org?format=json";

/// User property holding the public IP address.
pub const CLIENT_IP_PROPERTY: &str = "clientIp";

/// Resolves the public IP address of this client.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait IpLookup: Send + Sync {
    async fn lookup(&self) -> AnalyticsResult<String>;
}

/// Looks the address up through the ipify JSON API.
#[derive(Clone, Debug)]
pub struct IpifyLookup {
    client: Client,
    endpoint: String,
}

impl Default for IpifyLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl IpifyLookup {
    pub fn new() -> Self {
        Self::with_endpoint(IPIFY_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Deserialize)]
struct IpifyResponse {
    ip: String,
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl IpLookup for IpifyLookup {
    async fn lookup(&self) -> AnalyticsResult<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|err| network_error(format!("IP lookup failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(network_error(format!(
                "IP lookup failed with status {status}"
            )));
        }

        let body: IpifyResponse = response
            .json()
            .await
            .map_err(|err| internal_error(format!("Unexpected IP lookup response: {err}")))?;
        Ok(body.ip)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Development build; no lookup was made.
    Skipped,
    /// The address was stored as the `clientIp` user property.
    Recorded(String),
    Failed(AnalyticsError),
}

/// Runs [`enrich_now`] in the background and forgets about it.
///
/// Development builds are rejected before anything is spawned; returns whether a lookup task
/// was started.
pub fn enrich(analytics: Arc<Analytics>, mode: BuildMode, lookup: Arc<dyn IpLookup>) -> bool {
    if mode.is_development() {
        return false;
    }
    spawn_detached(async move {
        enrich_now(&analytics, mode, lookup.as_ref()).await;
    });
    true
}

/// Looks up the client IP once and records it as a user property.
pub async fn enrich_now(
    analytics: &Analytics,
    mode: BuildMode,
    lookup: &dyn IpLookup,
) -> EnrichOutcome {
    if mode.is_development() {
        return EnrichOutcome::Skipped;
    }

    let result = lookup.lookup().await.and_then(|ip| {
        analytics.set_user_properties([(CLIENT_IP_PROPERTY, Value::String(ip.clone()))])?;
        Ok(ip)
    });

    match result {
        Ok(ip) => {
            LOGGER.debug(format!(
                "Recorded client IP for app '{}'",
                analytics.app().name()
            ));
            EnrichOutcome::Recorded(ip)
        }
        Err(err) => {
            LOGGER.debug(format!("Skipping client IP enrichment: {err}"));
            EnrichOutcome::Failed(err)
        }
    }
}
