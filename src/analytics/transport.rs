use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::analytics::error::{internal_error, invalid_argument, network_error, AnalyticsResult};

/// Configuration used to dispatch analytics events through the GA4 Measurement Protocol.
#[derive(Clone, Debug)]
pub struct MeasurementProtocolConfig {
    measurement_id: String,
    api_secret: String,
    endpoint: MeasurementProtocolEndpoint,
    timeout: Duration,
}

impl MeasurementProtocolConfig {
    pub fn new(measurement_id: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            measurement_id: measurement_id.into(),
            api_secret: api_secret.into(),
            endpoint: MeasurementProtocolEndpoint::Collect,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_endpoint(mut self, endpoint: MeasurementProtocolEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Request timeout. Ignored on wasm, where the browser owns the fetch lifetime.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn measurement_id(&self) -> &str {
        &self.measurement_id
    }

    pub(crate) fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

/// Supported endpoints for the Measurement Protocol.
#[derive(Clone, Debug)]
pub enum MeasurementProtocolEndpoint {
    /// Production collection endpoint: <https://www.google-analytics.com/mp/collect>
    Collect,
    /// Debugging endpoint: <https://www.google-analytics.com/debug/mp/collect>
    DebugCollect,
    /// Custom endpoint (primarily for testing).
    Custom(String),
}

impl MeasurementProtocolEndpoint {
    fn as_str(&self) -> &str {
        match self {
            MeasurementProtocolEndpoint::Collect => "https://www.google-analytics.com/mp/collect",
            MeasurementProtocolEndpoint::DebugCollect => {
                "https://www.google-analytics.com/debug/mp/collect"
            }
            MeasurementProtocolEndpoint::Custom(url) => url,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MeasurementProtocolDispatcher {
    client: Client,
    config: MeasurementProtocolConfig,
}

impl MeasurementProtocolDispatcher {
    pub fn new(config: MeasurementProtocolConfig) -> AnalyticsResult<Self> {
        if config.measurement_id().trim().is_empty() {
            return Err(invalid_argument(
                "measurement protocol measurement_id must not be empty",
            ));
        }
        if config.api_secret().trim().is_empty() {
            return Err(invalid_argument(
                "measurement protocol api_secret must not be empty",
            ));
        }

        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.timeout);
        let client = builder
            .build()
            .map_err(|err| internal_error(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { client, config })
    }

    /// Sends one event, together with the current user properties, for `client_id`.
    pub async fn send_event(
        &self,
        client_id: &str,
        event_name: &str,
        params: &BTreeMap<String, String>,
        user_properties: &BTreeMap<String, Value>,
    ) -> AnalyticsResult<()> {
        let payload = MeasurementPayload {
            client_id,
            user_properties: user_properties
                .iter()
                .map(|(key, value)| (key.as_str(), UserPropertyValue { value }))
                .collect(),
            events: vec![MeasurementEvent {
                name: event_name,
                params,
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint.as_str())
            .query(&[
                ("measurement_id", self.config.measurement_id()),
                ("api_secret", self.config.api_secret()),
            ])
            .json(&payload)
            .send()
            .await
            .map_err(|err| network_error(format!("failed to send analytics event: {err}")))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unavailable response body>".to_string());

        let message = match status {
            StatusCode::BAD_REQUEST => {
                format!("measurement protocol rejected the event (400). Response: {body}")
            }
            _ => format!(
                "measurement protocol request failed with status {status}. Response: {body}"
            ),
        };

        Err(network_error(message))
    }

    pub fn config(&self) -> &MeasurementProtocolConfig {
        &self.config
    }
}

#[derive(Serialize)]
struct MeasurementPayload<'a> {
    client_id: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    user_properties: BTreeMap<&'a str, UserPropertyValue<'a>>,
    events: Vec<MeasurementEvent<'a>>,
}

#[derive(Serialize)]
struct UserPropertyValue<'a> {
    value: &'a Value,
}

#[derive(Serialize)]
struct MeasurementEvent<'a> {
    name: &'a str,
    params: &'a BTreeMap<String, String>,
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn rejects_blank_credentials() {
        let err = MeasurementProtocolDispatcher::new(MeasurementProtocolConfig::new(" ", "secret"))
            .unwrap_err();
        assert_eq!(err.code_str(), "analytics/invalid-argument");
        assert!(MeasurementProtocolDispatcher::new(MeasurementProtocolConfig::new("G-1", "")).is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn posts_events_with_user_properties() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/mp/collect")
                    .query_param("measurement_id", "G-TEST")
                    .query_param("api_secret", "secret")
                    .json_body(json!({
                        "client_id": "client-1",
                        "user_properties": { "clientIp": { "value": "203.0.113.7" } },
                        "events": [{ "name": "screen_view", "params": { "screen": "home" } }]
                    }));
                then.status(204);
            })
            .await;

        let config = MeasurementProtocolConfig::new("G-TEST", "secret")
            .with_endpoint(MeasurementProtocolEndpoint::Custom(server.url("/mp/collect")));
        let dispatcher = MeasurementProtocolDispatcher::new(config).unwrap();
        let params = BTreeMap::from([("screen".to_string(), "home".to_string())]);
        let properties = BTreeMap::from([("clientIp".to_string(), json!("203.0.113.7"))]);

        dispatcher
            .send_event("client-1", "screen_view", &params, &properties)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn surfaces_rejections_as_network_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/mp/collect");
                then.status(400).body("bad event");
            })
            .await;

        let config = MeasurementProtocolConfig::new("G-TEST", "secret")
            .with_endpoint(MeasurementProtocolEndpoint::Custom(server.url("/mp/collect")));
        let dispatcher = MeasurementProtocolDispatcher::new(config).unwrap();
        let err = dispatcher
            .send_event("client-1", "oops", &BTreeMap::new(), &BTreeMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "analytics/network");
        assert!(err.to_string().contains("bad event"));
    }
}
