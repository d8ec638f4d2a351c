//! # Backend initialization
//!
//! Turns an environment tag into a [`Backend`]: the app, its auth and database handles, and an
//! analytics handle that is resolved in the background.
//!
//! ```no_run
//! use firebase_app_shell::backend::init_backend;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = init_backend("dev")?;
//! let reference = backend.database().reference("status")?;
//! reference.set(serde_json::json!("online")).await?;
//!
//! // `analytics()` is `None` until the support probe finishes.
//! if let Some(analytics) = backend.analytics_ready().await {
//!     analytics.log_event("app_open", Default::default()).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod error;

pub use api::{init_backend, AnalyticsSlot, Backend, BackendBuilder};
pub use error::{BackendError, BackendResult};
