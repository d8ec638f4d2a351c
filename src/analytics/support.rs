use async_trait::async_trait;

use crate::app::FirebaseApp;
use crate::platform::environment::{are_cookies_enabled, env_flag, is_browser};

/// Setting this variable to a truthy value turns analytics off for the whole process.
pub const ANALYTICS_DISABLED_ENV: &str = "FIREBASE_ANALYTICS_DISABLED";

/// Decides whether analytics can run for an app in the current environment.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait SupportProbe: Send + Sync {
    async fn is_supported(&self, app: &FirebaseApp) -> bool;
}

/// The probe used unless a builder overrides it.
///
/// Analytics needs a measurement ID, must not be disabled through
/// `FIREBASE_ANALYTICS_DISABLED`, and on wasm requires a browser window with cookies.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSupportProbe;

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl SupportProbe for DefaultSupportProbe {
    async fn is_supported(&self, app: &FirebaseApp) -> bool {
        is_supported(app).await
    }
}

/// Fixed answer, for tests and for callers that already know.
#[derive(Clone, Copy, Debug)]
pub struct StaticSupport(pub bool);

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl SupportProbe for StaticSupport {
    async fn is_supported(&self, _app: &FirebaseApp) -> bool {
        self.0
    }
}

pub async fn is_supported(app: &FirebaseApp) -> bool {
    let has_measurement_id = app
        .options()
        .measurement_id
        .is_some_and(|id| !id.trim().is_empty());
    if !has_measurement_id {
        log::debug!("analytics unsupported for '{}': no measurement id", app.name());
        return false;
    }
    if env_flag(ANALYTICS_DISABLED_ENV) {
        log::debug!("analytics disabled through {ANALYTICS_DISABLED_ENV}");
        return false;
    }
    if cfg!(target_arch = "wasm32") {
        return is_browser() && are_cookies_enabled();
    }
    true
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn app_with(measurement_id: Option<&str>) -> FirebaseApp {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let settings = FirebaseAppSettings {
            name: Some(format!("support-{}", COUNTER.fetch_add(1, Ordering::SeqCst))),
            ..Default::default()
        };
        let options = FirebaseOptions {
            project_id: Some("support".into()),
            measurement_id: measurement_id.map(str::to_string),
            ..Default::default()
        };
        initialize_app(options, Some(settings)).unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn requires_a_measurement_id() {
        assert!(!is_supported(&app_with(None)).await);
        assert!(!is_supported(&app_with(Some("  "))).await);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn static_probe_overrides_the_environment() {
        let app = app_with(None);
        assert!(StaticSupport(true).is_supported(&app).await);
        assert!(!StaticSupport(false).is_supported(&app).await);
    }
}
