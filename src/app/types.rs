use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::app::errors::{AppError, AppResult};

/// Type-erased service instance cached on an app.
pub type DynService = Arc<dyn Any + Send + Sync>;

/// Connection configuration for one Firebase project, using the field names of the web
/// config object (`apiKey`, `databaseURL`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(
        default,
        rename = "databaseURL",
        alias = "databaseUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub database_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

impl FirebaseOptions {
    /// Returns `true` when at least one option carries a value.
    pub fn is_defined(&self) -> bool {
        self.api_key.is_some()
            || self.project_id.is_some()
            || self.app_id.is_some()
            || self.auth_domain.is_some()
            || self.database_url.is_some()
            || self.storage_bucket.is_some()
            || self.messaging_sender_id.is_some()
            || self.measurement_id.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseAppSettings {
    pub name: Option<String>,
    pub automatic_data_collection_enabled: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseAppConfig {
    pub name: Arc<str>,
    pub automatic_data_collection_enabled: bool,
}

impl FirebaseAppConfig {
    pub fn new(name: impl Into<String>, automatic: bool) -> Self {
        Self {
            name: Arc::from(name.into().into_boxed_str()),
            automatic_data_collection_enabled: automatic,
        }
    }
}

/// A named, initialized Firebase app. Clones share the same instance and service cache.
#[derive(Clone)]
pub struct FirebaseApp {
    inner: Arc<FirebaseAppInner>,
}

struct FirebaseAppInner {
    options: FirebaseOptions,
    config: FirebaseAppConfig,
    automatic_data_collection_enabled: AtomicBool,
    is_deleted: AtomicBool,
    services: Mutex<HashMap<&'static str, DynService>>,
}

impl FirebaseApp {
    pub fn new(options: FirebaseOptions, config: FirebaseAppConfig) -> Self {
        let automatic = config.automatic_data_collection_enabled;
        Self {
            inner: Arc::new(FirebaseAppInner {
                options,
                config,
                automatic_data_collection_enabled: AtomicBool::new(automatic),
                is_deleted: AtomicBool::new(false),
                services: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn options(&self) -> FirebaseOptions {
        self.inner.options.clone()
    }

    pub fn config(&self) -> FirebaseAppConfig {
        self.inner.config.clone()
    }

    pub fn automatic_data_collection_enabled(&self) -> bool {
        self.inner
            .automatic_data_collection_enabled
            .load(Ordering::SeqCst)
    }

    pub fn set_automatic_data_collection_enabled(&self, value: bool) {
        self.inner
            .automatic_data_collection_enabled
            .store(value, Ordering::SeqCst);
    }

    /// Returns `true` when both handles refer to the same underlying app instance.
    pub fn ptr_eq(&self, other: &FirebaseApp) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.is_deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn set_is_deleted(&self, value: bool) {
        self.inner.is_deleted.store(value, Ordering::SeqCst);
        if value {
            self.services().clear();
        }
    }

    pub fn check_destroyed(&self) -> AppResult<()> {
        if self.is_deleted() {
            return Err(AppError::AppDeleted {
                app_name: self.name().to_owned(),
            });
        }
        Ok(())
    }

    /// Returns the cached service registered under `name`, if any.
    pub fn service<T>(&self, name: &'static str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let service = self.services().get(name).cloned()?;
        service.downcast::<T>().ok()
    }

    /// Returns the service registered under `name`, building it with `factory` on first use.
    ///
    /// The factory runs without the cache lock held; when two callers race, the first instance
    /// stored wins and the other is discarded.
    pub fn get_or_init_service<T, E, F>(&self, name: &'static str, factory: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        E: From<AppError>,
        F: FnOnce(&FirebaseApp) -> Result<T, E>,
    {
        self.check_destroyed()?;
        if let Some(existing) = self.services().get(name).cloned() {
            return self.downcast_service(name, existing).map_err(E::from);
        }

        let created: DynService = Arc::new(factory(self)?);
        let stored = self.services().entry(name).or_insert(created).clone();
        self.downcast_service(name, stored).map_err(E::from)
    }

    fn downcast_service<T>(&self, name: &str, service: DynService) -> AppResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        service
            .downcast::<T>()
            .map_err(|_| AppError::ServiceMismatch {
                app_name: self.name().to_owned(),
                service: name.to_owned(),
            })
    }

    fn services(&self) -> MutexGuard<'_, HashMap<&'static str, DynService>> {
        self.inner
            .services
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl std::fmt::Debug for FirebaseApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseApp")
            .field("name", &self.name())
            .field(
                "automatic_data_collection_enabled",
                &self.automatic_data_collection_enabled(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> FirebaseApp {
        FirebaseApp::new(
            FirebaseOptions {
                project_id: Some("types-test".into()),
                ..Default::default()
            },
            FirebaseAppConfig::new("types-test", true),
        )
    }

    #[test]
    fn options_use_web_config_field_names() {
        let options: FirebaseOptions = serde_json::from_str(
            r#"{"apiKey":"key","databaseURL":"https://demo.firebaseio.com","measurementId":"G-1"}"#,
        )
        .unwrap();
        assert_eq!(options.api_key.as_deref(), Some("key"));
        assert_eq!(
            options.database_url.as_deref(),
            Some("https://demo.firebaseio.com")
        );
        assert_eq!(options.measurement_id.as_deref(), Some("G-1"));

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["databaseURL"], "https://demo.firebaseio.com");
        assert!(json.get("projectId").is_none());
    }

    #[test]
    fn services_are_built_once() {
        let app = app();
        let first: Arc<String> = app
            .get_or_init_service::<_, AppError, _>("greeting", |_| Ok("hello".to_string()))
            .unwrap();
        let second: Arc<String> = app
            .get_or_init_service::<_, AppError, _>("greeting", |_| Ok("ignored".to_string()))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.as_str(), "hello");
    }

    #[test]
    fn service_type_mismatch_is_reported() {
        let app = app();
        let _: Arc<u32> = app
            .get_or_init_service::<_, AppError, _>("counter", |_| Ok(1u32))
            .unwrap();
        let err = app
            .get_or_init_service::<String, AppError, _>("counter", |_| Ok(String::new()))
            .unwrap_err();
        assert!(matches!(err, AppError::ServiceMismatch { .. }));
        assert!(app.service::<String>("counter").is_none());
        assert_eq!(*app.service::<u32>("counter").unwrap(), 1);
    }

    #[test]
    fn deleted_apps_refuse_new_services() {
        let app = app();
        app.set_is_deleted(true);
        let err = app
            .get_or_init_service::<u8, AppError, _>("late", |_| Ok(0))
            .unwrap_err();
        assert!(matches!(err, AppError::AppDeleted { .. }));
    }
}
