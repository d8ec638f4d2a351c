#[cfg(not(target_arch = "wasm32"))]
use std::env;
#[cfg(not(target_arch = "wasm32"))]
use std::process::ExitCode;

#[cfg(not(target_arch = "wasm32"))]
use firebase_app_shell::backend::init_backend;
#[cfg(not(target_arch = "wasm32"))]
use firebase_app_shell::logger::Logger;

#[cfg(not(target_arch = "wasm32"))]
const APP_ENV: &str = "APP_ENV";
#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_ENVIRONMENT: &str = "dev";

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    let logger = Logger::new("@app-shell/main");
    let environment = env::var(APP_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            logger.error(format!("Failed to start tokio runtime: {err}"));
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let backend = match init_backend(environment.as_str()) {
            Ok(backend) => backend,
            Err(err) => {
                logger.error(format!("Backend initialization failed: {err}"));
                return ExitCode::FAILURE;
            }
        };

        logger.info(format!(
            "Backend ready for '{}' (project {})",
            backend.environment(),
            backend
                .app()
                .options()
                .project_id
                .unwrap_or_else(|| "<unset>".to_string())
        ));

        match backend.analytics_ready().await {
            Some(analytics) => logger.info(format!(
                "Analytics enabled (client id {})",
                analytics.client_id()
            )),
            None => logger.info("Analytics not supported in this environment"),
        }
        ExitCode::SUCCESS
    })
}

#[cfg(target_arch = "wasm32")]
fn main() {}
