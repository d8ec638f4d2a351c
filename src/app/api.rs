use crate::app::constants::DEFAULT_ENTRY_NAME;
use crate::app::errors::{AppError, AppResult};
use crate::app::registry::{apps_guard, LOGGER};
use crate::app::types::{FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};

pub static SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

fn normalize_name(settings: &FirebaseAppSettings) -> AppResult<String> {
    let name = settings
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_ENTRY_NAME.to_string());
    if name.trim().is_empty() {
        return Err(AppError::BadAppName { app_name: name });
    }
    Ok(name)
}

fn app_config(settings: &FirebaseAppSettings) -> AppResult<FirebaseAppConfig> {
    let name = normalize_name(settings)?;
    let automatic = settings.automatic_data_collection_enabled.unwrap_or(true);
    Ok(FirebaseAppConfig::new(name, automatic))
}

/// Creates and registers a new app.
///
/// Initializing the same name twice with identical options and settings returns the existing
/// instance; any difference is rejected with [`AppError::DuplicateApp`].
pub fn initialize_app(
    options: FirebaseOptions,
    settings: Option<FirebaseAppSettings>,
) -> AppResult<FirebaseApp> {
    let config = app_config(&settings.unwrap_or_default())?;
    if !options.is_defined() {
        return Err(AppError::NoOptions);
    }

    let mut apps = apps_guard();
    if let Some(existing) = apps.get(config.name.as_ref()) {
        if existing.options() == options && existing.config() == config {
            return Ok(existing.clone());
        }
        return Err(AppError::DuplicateApp {
            app_name: config.name.to_string(),
        });
    }

    let app = FirebaseApp::new(options, config);
    apps.insert(app.name().to_owned(), app.clone());
    LOGGER.debug(format!("Initialized Firebase App '{}'", app.name()));
    Ok(app)
}

/// Returns the app registered under the settings' name, creating it when absent.
///
/// Unlike [`initialize_app`], an existing app is reused even when its options differ; the
/// mismatch is logged. The boolean is `true` when an existing app was returned.
pub fn get_or_initialize_app(
    options: FirebaseOptions,
    settings: Option<FirebaseAppSettings>,
) -> AppResult<(FirebaseApp, bool)> {
    let config = app_config(&settings.unwrap_or_default())?;

    let mut apps = apps_guard();
    if let Some(existing) = apps.get(config.name.as_ref()) {
        if existing.options() != options {
            LOGGER.warn(format!(
                "Reusing Firebase App '{}' that was initialized with different options",
                existing.name()
            ));
        }
        return Ok((existing.clone(), true));
    }

    if !options.is_defined() {
        return Err(AppError::NoOptions);
    }
    let app = FirebaseApp::new(options, config);
    apps.insert(app.name().to_owned(), app.clone());
    LOGGER.debug(format!("Initialized Firebase App '{}'", app.name()));
    Ok((app, false))
}

pub fn get_app(name: Option<&str>) -> AppResult<FirebaseApp> {
    let lookup = name.unwrap_or(DEFAULT_ENTRY_NAME);
    apps_guard()
        .get(lookup)
        .cloned()
        .ok_or_else(|| AppError::NoApp {
            app_name: lookup.to_string(),
        })
}

pub fn get_apps() -> Vec<FirebaseApp> {
    apps_guard().values().cloned().collect()
}

/// Removes the app from the registry and drops its cached services.
pub fn delete_app(app: &FirebaseApp) -> AppResult<()> {
    let removed = {
        let mut apps = apps_guard();
        match apps.get(app.name()) {
            Some(registered) if registered.ptr_eq(app) => apps.remove(app.name()),
            _ => None,
        }
    };

    if removed.is_some() {
        app.set_is_deleted(true);
        LOGGER.debug(format!("Deleted Firebase App '{}'", app.name()));
    }
    Ok(())
}
