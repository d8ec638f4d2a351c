use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::analytics::error::{invalid_argument, AnalyticsResult};
use crate::analytics::transport::{MeasurementProtocolConfig, MeasurementProtocolDispatcher};
use crate::app::{get_app, FirebaseApp};
use crate::logger::Logger;

pub(crate) const ANALYTICS_COMPONENT_NAME: &str = "analytics";

pub(crate) static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@app-shell/analytics"));

#[derive(Clone)]
pub struct Analytics {
    inner: Arc<AnalyticsInner>,
}

impl fmt::Debug for Analytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analytics")
            .field("app", &self.inner.app.name())
            .finish()
    }
}

struct AnalyticsInner {
    app: FirebaseApp,
    events: Mutex<Vec<AnalyticsEvent>>,
    client_id: Mutex<String>,
    user_properties: Mutex<BTreeMap<String, Value>>,
    transport: Mutex<Option<Arc<dyn AnalyticsTransport>>>,
    collection_enabled: AtomicBool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
trait AnalyticsTransport: Send + Sync {
    async fn send(
        &self,
        client_id: &str,
        event: &AnalyticsEvent,
        user_properties: &BTreeMap<String, Value>,
    ) -> AnalyticsResult<()>;
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl AnalyticsTransport for MeasurementProtocolDispatcher {
    async fn send(
        &self,
        client_id: &str,
        event: &AnalyticsEvent,
        user_properties: &BTreeMap<String, Value>,
    ) -> AnalyticsResult<()> {
        self.send_event(client_id, &event.name, &event.params, user_properties)
            .await
    }
}

impl Analytics {
    fn new(app: FirebaseApp) -> Self {
        let collection_enabled = app.automatic_data_collection_enabled();
        let inner = AnalyticsInner {
            app,
            events: Mutex::new(Vec::new()),
            client_id: Mutex::new(generate_client_id()),
            user_properties: Mutex::new(BTreeMap::new()),
            transport: Mutex::new(None),
            collection_enabled: AtomicBool::new(collection_enabled),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.inner.app
    }

    /// Merges `properties` into the user properties attached to every dispatched event.
    /// A `null` value clears the property.
    pub fn set_user_properties<I, K>(&self, properties: I) -> AnalyticsResult<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut updates = Vec::new();
        for (name, value) in properties {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(invalid_argument("User property name must not be empty"));
            }
            updates.push((name, value));
        }

        let mut current = lock(&self.inner.user_properties);
        for (name, value) in updates {
            if value.is_null() {
                current.remove(&name);
            } else {
                current.insert(name, value);
            }
        }
        Ok(())
    }

    pub fn user_properties(&self) -> BTreeMap<String, Value> {
        lock(&self.inner.user_properties).clone()
    }

    /// Records `name` locally and forwards it through the measurement protocol when one is
    /// configured and collection is enabled.
    pub async fn log_event(
        &self,
        name: &str,
        params: BTreeMap<String, String>,
    ) -> AnalyticsResult<()> {
        validate_event_name(name)?;
        let event = AnalyticsEvent {
            name: name.to_string(),
            params,
        };
        lock(&self.inner.events).push(event.clone());

        self.dispatch_event(&event).await
    }

    pub fn recorded_events(&self) -> Vec<AnalyticsEvent> {
        lock(&self.inner.events).clone()
    }

    /// Forwards future events through the GA4 Measurement Protocol, replacing any previously
    /// configured dispatcher.
    pub fn configure_measurement_protocol(
        &self,
        config: MeasurementProtocolConfig,
    ) -> AnalyticsResult<()> {
        let dispatcher = MeasurementProtocolDispatcher::new(config)?;
        *lock(&self.inner.transport) = Some(Arc::new(dispatcher));
        Ok(())
    }

    pub fn client_id(&self) -> String {
        lock(&self.inner.client_id).clone()
    }

    /// Overrides the randomly generated client identifier reported to the measurement protocol.
    pub fn set_client_id(&self, client_id: impl Into<String>) {
        *lock(&self.inner.client_id) = client_id.into();
    }

    /// When disabled, events are still recorded locally but never dispatched.
    pub fn set_collection_enabled(&self, enabled: bool) {
        self.inner
            .collection_enabled
            .store(enabled, Ordering::SeqCst);
    }

    pub fn collection_enabled(&self) -> bool {
        self.inner.collection_enabled.load(Ordering::SeqCst)
    }

    async fn dispatch_event(&self, event: &AnalyticsEvent) -> AnalyticsResult<()> {
        if !self.collection_enabled() {
            return Ok(());
        }
        let Some(transport) = lock(&self.inner.transport).clone() else {
            return Ok(());
        };

        let client_id = self.client_id();
        let user_properties = self.user_properties();
        transport
            .send(&client_id, event, &user_properties)
            .await
            .inspect_err(|err| LOGGER.warn(format!("Dropping event '{}': {err}", event.name)))
    }

    #[cfg(test)]
    fn set_transport_for_tests(&self, transport: Arc<dyn AnalyticsTransport>) {
        *lock(&self.inner.transport) = Some(transport);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn validate_event_name(name: &str) -> AnalyticsResult<()> {
    if name.trim().is_empty() {
        return Err(invalid_argument("Event name must not be empty"));
    }
    Ok(())
}

fn generate_client_id() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(32)
        .collect()
}

/// Returns the analytics handle of `app` (or of the default app), creating it on first use.
///
/// This does not check [`is_supported`](crate::analytics::is_supported); callers that care
/// should probe first, as [`crate::backend`] does.
pub fn get_analytics(app: Option<FirebaseApp>) -> AnalyticsResult<Arc<Analytics>> {
    let app = match app {
        Some(app) => app,
        None => get_app(None)?,
    };
    app.get_or_init_service(ANALYTICS_COMPONENT_NAME, |app| {
        Ok(Analytics::new(app.clone()))
    })
}
