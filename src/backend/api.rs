use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use async_lock::OnceCell;

use crate::analytics::{
    enrich, get_analytics, Analytics, DefaultSupportProbe, IpLookup, IpifyLookup, SupportProbe,
};
use crate::app::{get_or_initialize_app, AppError, FirebaseApp, FirebaseAppSettings};
use crate::auth::{auth_for_app, Auth};
use crate::backend::error::BackendResult;
use crate::config::ConfigRegistry;
use crate::database::{get_database, Database};
use crate::logger::Logger;
use crate::platform::environment::BuildMode;
use crate::platform::runtime::spawn_detached;

const ANALYTICS_SLOT_COMPONENT_NAME: &str = "analytics-slot";

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@app-shell/backend"));

/// The analytics handle of an app, resolved exactly once by a background probe.
///
/// Until the probe finishes the slot is empty; afterwards it holds `Some` when analytics is
/// supported and `None` when it is not. It never changes again.
pub struct AnalyticsSlot {
    cell: OnceCell<Option<Arc<Analytics>>>,
    probe_started: AtomicBool,
}

impl AnalyticsSlot {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            probe_started: AtomicBool::new(false),
        }
    }

    /// `Some(None)` once resolved as unsupported, `None` while still pending.
    pub fn get(&self) -> Option<Option<Arc<Analytics>>> {
        self.cell.get().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.is_initialized()
    }

    pub async fn wait(&self) -> Option<Arc<Analytics>> {
        self.cell.wait().await.clone()
    }

    /// Returns `true` for the first caller only, until a lost probe releases the claim.
    fn claim_probe(&self) -> bool {
        !self.probe_started.swap(true, Ordering::SeqCst)
    }

    fn release_probe(&self) {
        self.probe_started.store(false, Ordering::SeqCst);
    }

    async fn resolve(&self, analytics: Option<Arc<Analytics>>) {
        if self.cell.set(analytics).await.is_err() {
            log::debug!("analytics slot already resolved");
        }
    }
}

impl fmt::Debug for AnalyticsSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.cell.get() {
            None => "pending",
            Some(Some(_)) => "ready",
            Some(None) => "unsupported",
        };
        f.debug_struct("AnalyticsSlot").field("state", &state).finish()
    }
}

/// The initialized service handles for one environment.
///
/// Clones share every handle. Initializing the same app again yields handles that are
/// pointer-equal to the first ones.
#[derive(Clone)]
pub struct Backend {
    environment: Arc<str>,
    app: FirebaseApp,
    auth: Arc<Auth>,
    database: Arc<Database>,
    analytics: Arc<AnalyticsSlot>,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("environment", &self.environment)
            .field("app", &self.app.name())
            .field("analytics", &self.analytics)
            .finish()
    }
}

impl Backend {
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.app
    }

    pub fn auth(&self) -> &Arc<Auth> {
        &self.auth
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// The analytics handle if the support probe has already succeeded. Never blocks.
    pub fn analytics(&self) -> Option<Arc<Analytics>> {
        self.analytics.get().flatten()
    }

    /// Waits for the support probe and returns its result.
    pub async fn analytics_ready(&self) -> Option<Arc<Analytics>> {
        self.analytics.wait().await
    }

    pub fn analytics_slot(&self) -> &Arc<AnalyticsSlot> {
        &self.analytics
    }
}

/// Step-by-step construction of a [`Backend`] with overridable collaborators.
pub struct BackendBuilder {
    environment: String,
    app_name: Option<String>,
    registry: Option<ConfigRegistry>,
    build_mode: Option<BuildMode>,
    support_probe: Arc<dyn SupportProbe>,
    ip_lookup: Arc<dyn IpLookup>,
}

impl fmt::Debug for BackendBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendBuilder")
            .field("environment", &self.environment)
            .field("app_name", &self.app_name)
            .field("build_mode", &self.build_mode)
            .finish()
    }
}

impl BackendBuilder {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            app_name: None,
            registry: None,
            build_mode: None,
            support_probe: Arc::new(DefaultSupportProbe),
            ip_lookup: Arc::new(IpifyLookup::new()),
        }
    }

    /// Name of the app to create or reuse; the default app when unset.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Registry to look the environment up in; [`ConfigRegistry::from_env`] when unset.
    pub fn registry(mut self, registry: ConfigRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build mode passed to the enricher; [`BuildMode::from_env`] when unset.
    pub fn build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = Some(mode);
        self
    }

    pub fn support_probe(mut self, probe: Arc<dyn SupportProbe>) -> Self {
        self.support_probe = probe;
        self
    }

    pub fn ip_lookup(mut self, lookup: Arc<dyn IpLookup>) -> Self {
        self.ip_lookup = lookup;
        self
    }

    /// Initializes (or reuses) the app and its services.
    ///
    /// The configuration is looked up before anything else, so an unknown environment fails
    /// without touching the app registry. Analytics is resolved in the background.
    pub fn build(self) -> BackendResult<Backend> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => ConfigRegistry::from_env()?,
        };
        let options = registry.lookup(&self.environment)?;

        let settings = FirebaseAppSettings {
            name: self.app_name,
            ..Default::default()
        };
        let (app, reused) = get_or_initialize_app(options, Some(settings))?;

        let auth = auth_for_app(&app)?;
        let database = get_database(Some(app.clone()))?;
        let analytics = app.get_or_init_service::<_, AppError, _>(
            ANALYTICS_SLOT_COMPONENT_NAME,
            |_| Ok(AnalyticsSlot::new()),
        )?;

        if analytics.claim_probe() {
            let mode = self.build_mode.unwrap_or_else(BuildMode::from_env);
            spawn_analytics_probe(
                app.clone(),
                Arc::clone(&analytics),
                self.support_probe,
                mode,
                self.ip_lookup,
            );
        }

        LOGGER.info(format!(
            "{} backend for environment '{}' (app '{}')",
            if reused { "Reused" } else { "Initialized" },
            self.environment,
            app.name()
        ));

        Ok(Backend {
            environment: Arc::from(self.environment),
            app,
            auth,
            database,
            analytics,
        })
    }
}

/// Initializes the backend for `environment` with the default collaborators.
pub fn init_backend(environment: impl Into<String>) -> BackendResult<Backend> {
    BackendBuilder::new(environment).build()
}

/// Held by the probe task. Dropping the task before it resolves the slot (runtime shutdown,
/// no runtime to spawn on) hands the probe back to the next initialization of the app.
struct ProbeClaim {
    slot: Arc<AnalyticsSlot>,
}

impl Drop for ProbeClaim {
    fn drop(&mut self) {
        if !self.slot.is_resolved() {
            self.slot.release_probe();
            LOGGER.warn(
                "Analytics probe stopped before resolving; the next initialization retries it",
            );
        }
    }
}

fn spawn_analytics_probe(
    app: FirebaseApp,
    slot: Arc<AnalyticsSlot>,
    probe: Arc<dyn SupportProbe>,
    mode: BuildMode,
    lookup: Arc<dyn IpLookup>,
) {
    let claim = ProbeClaim { slot };
    spawn_detached(async move {
        let analytics = match resolve_analytics(&app, probe.as_ref(), mode, lookup).await {
            Ok(analytics) => analytics,
            Err(err) => {
                LOGGER.warn(format!("Analytics unavailable for '{}': {err}", app.name()));
                None
            }
        };
        if analytics.is_none() {
            LOGGER.debug(format!("Analytics not supported for '{}'", app.name()));
        }
        claim.slot.resolve(analytics).await;
    });
}

async fn resolve_analytics(
    app: &FirebaseApp,
    probe: &dyn SupportProbe,
    mode: BuildMode,
    lookup: Arc<dyn IpLookup>,
) -> BackendResult<Option<Arc<Analytics>>> {
    if !probe.is_supported(app).await {
        return Ok(None);
    }
    let analytics = get_analytics(Some(app.clone()))?;
    if !enrich(Arc::clone(&analytics), mode, lookup) {
        LOGGER.debug(format!("Client IP enrichment skipped for '{}'", app.name()));
    }
    Ok(Some(analytics))
}
