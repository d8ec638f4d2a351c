//! Typed reads and merge updates of single database fields.
//!
//! ```
//! use firebase_app_shell::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
//! use firebase_app_shell::database::get_database;
//! use firebase_app_shell::fields::{get_field_value, update_field_value};
//!
//! # futures::executor::block_on(async {
//! let options = FirebaseOptions {
//!     project_id: Some("demo-project".into()),
//!     ..Default::default()
//! };
//! let settings = FirebaseAppSettings {
//!     name: Some("fields-doc".into()),
//!     ..Default::default()
//! };
//! let database = get_database(Some(initialize_app(options, Some(settings)).unwrap())).unwrap();
//!
//! update_field_value(&database, "settings", "theme", "dark").await.unwrap();
//! let theme: Option<String> = get_field_value(&database, "settings/theme").await.unwrap();
//! assert_eq!(theme.as_deref(), Some("dark"));
//! # });
//! ```

mod api;
mod error;

pub use api::{get_field_value, update_field_value};
pub use error::{FieldAccessError, FieldResult};
