//! # App registry
//!
//! Process-wide registry of named [`FirebaseApp`] instances. Each app owns its connection
//! options and a cache of service handles (auth, database, analytics), so asking twice for a
//! service of the same app yields the same instance.

mod api;
mod constants;
mod errors;
mod registry;
mod types;

#[doc(inline)]
pub use api::{
    delete_app, get_app, get_apps, get_or_initialize_app, initialize_app, SDK_VERSION,
};

#[doc(inline)]
pub use constants::DEFAULT_ENTRY_NAME;

#[doc(inline)]
pub use errors::{AppError, AppResult};

#[doc(inline)]
pub use types::{DynService, FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};
